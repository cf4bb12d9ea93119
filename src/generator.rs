//! Random level generation.
//!
//! Candidates are placed at random under a crowding rule and then handed to the solver, which has the final say.

use std::collections::HashSet;
use std::num::NonZero;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::{Builder, BuilderInvalidReason, SquareBoardBuilder};
use crate::cell::Cell;
use crate::color::{negate, Color, CHROMATIC};
use crate::level::Level;
use crate::location::{Dimension, Location};
use crate::shape::{BoardShape, SquareStep};
use crate::solver::{Solution, SolverFailure};

/// Random coordinates tried for each feature before giving up on it.
pub const PLACEMENT_ATTEMPTS: usize = 100;

const DEFAULT_SIDE: usize = 3;

/// Reasons a [`Generator`] may fail.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum GenerateError {
    /// No spot satisfying the crowding rule was found for some terminal.
    #[error("could not place a terminal in {} tries", PLACEMENT_ATTEMPTS)]
    PlacementExhausted,
    /// Every candidate was a duplicate, unsolvable, or could not be placed.
    #[error("no new solvable level in {0} attempts")]
    AttemptsExhausted(usize),
    /// The placed features did not fit the board. This should never happen.
    #[error("generated cells do not fit the grid: {0:?}")]
    InvalidBoard(Vec<BuilderInvalidReason>),
}

fn default_side() -> usize {
    DEFAULT_SIDE
}

/// Grid size of generated levels. A zero side is read as the default of 3.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Cells per row.
    #[serde(default = "default_side")]
    pub width: usize,
    /// Cells per column.
    #[serde(default = "default_side")]
    pub height: usize,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self { width: DEFAULT_SIDE, height: DEFAULT_SIDE }
    }
}

impl Dimensions {
    /// These dimensions as board dimensions.
    pub fn dims(&self) -> (Dimension, Dimension) {
        let side = |value: usize| NonZero::new(value).or(NonZero::new(DEFAULT_SIDE)).unwrap_or(NonZero::<usize>::MIN);
        (side(self.width), side(self.height))
    }

    fn area(&self) -> usize {
        let (width, height) = self.dims();
        width.get() * height.get()
    }
}

/// An inclusive range of counts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Fewest allowed.
    pub min: usize,
    /// Most allowed.
    pub max: usize,
}

impl Bounds {
    /// These bounds with `min` lowered to `max` if it was above it.
    pub fn clamped(self) -> Self {
        Self { min: self.min.min(self.max), max: self.max }
    }
}

/// Bounds as given in options, where either end may be left to a default.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoundsOverride {
    /// Overrides the default minimum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<usize>,
    /// Overrides the default maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}

impl BoundsOverride {
    /// Both ends given.
    pub fn exactly(min: usize, max: usize) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    fn over(&self, defaults: Bounds) -> Bounds {
        Bounds {
            min: self.min.unwrap_or(defaults.min),
            max: self.max.unwrap_or(defaults.max),
        }.clamped()
    }
}

/// What to generate. Any field left out of a JSON object takes its default.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Board size.
    pub grid: Dimensions,
    /// How many Start/End pairs. Defaults scale with the grid area.
    pub terminals: BoundsOverride,
    /// How many inverters. Defaults to none.
    pub inversions: BoundsOverride,
}

impl GeneratorOptions {
    /// Resolved bounds on the number of Start/End pairs.
    pub fn terminal_bounds(&self) -> Bounds {
        let root = (self.grid.area() as f64).sqrt();
        let defaults = Bounds {
            min: 2.max((root / 2.0).floor() as usize),
            max: (root.round() as usize).saturating_sub(1),
        };
        self.terminals.over(defaults)
    }

    /// Resolved bounds on the number of inverters.
    pub fn inversion_bounds(&self) -> Bounds {
        self.inversions.over(Bounds { min: 0, max: 0 })
    }
}

// occupied neighbors a cell tolerates: 2 in a corner, 3 along a wall, 4 inside
fn crowd_limit(location: Location, dims: (Dimension, Dimension)) -> usize {
    let on_x_edge = location.0 == 0 || location.0 + 1 == dims.0.get();
    let on_y_edge = location.1 == 0 || location.1 + 1 == dims.1.get();
    match (on_x_edge, on_y_edge) {
        (true, true) => 2,
        (true, false) | (false, true) => 3,
        (false, false) => 4,
    }
}

fn occupied_neighbors(builder: &SquareBoardBuilder, location: Location, dims: (Dimension, Dimension)) -> usize {
    SquareStep::neighbors_of(location, dims)
        .into_iter()
        .filter(|(_, neighbor)| builder.cell_at(*neighbor).is_some_and(|cell| cell.is_terminal()))
        .count()
}

fn uncrowded(builder: &SquareBoardBuilder, location: Location, dims: (Dimension, Dimension)) -> bool {
    std::iter::once(location)
        .chain(SquareStep::neighbors_of(location, dims).into_iter().map(|(_, neighbor)| neighbor))
        .all(|cell| occupied_neighbors(builder, cell, dims) < crowd_limit(cell, dims))
}

/// Whether `cell` may go at `location`: the spot is free, and neither it nor any neighbor is crowded, before or after.
pub(crate) fn fits(builder: &SquareBoardBuilder, location: Location, cell: Cell, dims: (Dimension, Dimension)) -> bool {
    if builder.cell_at(location) != Some(Cell::Empty) || !uncrowded(builder, location, dims) {
        return false;
    }

    let mut after = builder.clone();
    match cell {
        Cell::Start { color } => after.add_start(color, location),
        Cell::End { color } => after.add_end(color, location),
        Cell::Inverter => after.add_inverter(location),
        Cell::Empty => after.clear_location(location),
    };
    uncrowded(&after, location, dims)
}

/// Produces random levels. Use [`Self::generate_solvable`] to get levels that are known to have a solution.
pub struct Generator<R = StdRng> {
    rng: R,
}

impl Generator<StdRng> {
    /// A generator seeded from the operating system.
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    /// A generator that produces the same levels for the same seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for Generator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Generator<R> {
    /// A generator drawing from `rng`.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    fn random_location(&mut self, dims: (Dimension, Dimension)) -> Location {
        Location(self.rng.random_range(0..dims.0.get()), self.rng.random_range(0..dims.1.get()))
    }

    fn random_chromatic(&mut self) -> Color {
        CHROMATIC[self.rng.random_range(0..CHROMATIC.len())]
    }

    /// Start and End colors for `pairs` pairs.
    ///
    /// The first pair ends in its own color, or, on a board with inverters, possibly in its negation.
    /// Later pairs are unconstrained.
    pub(crate) fn pair_colors(&mut self, pairs: usize, inverted: bool) -> Vec<(Color, Color)> {
        let mut colors = Vec::with_capacity(pairs);
        for index in 0..pairs {
            let start = self.random_chromatic();
            let end = if index > 0 {
                self.random_chromatic()
            } else if inverted && self.rng.random_bool(0.5) {
                negate(start)
            } else {
                start
            };
            colors.push((start, end));
        }
        colors
    }

    fn place_terminal(&mut self, builder: &SquareBoardBuilder, cell: Cell, dims: (Dimension, Dimension)) -> Result<Location, GenerateError> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let candidate = self.random_location(dims);
            if fits(builder, candidate, cell, dims) {
                return Ok(candidate);
            }
        }

        Err(GenerateError::PlacementExhausted)
    }

    /// Place a random level according to `options`. The level may well be unsolvable.
    pub fn generate_level(&mut self, options: &GeneratorOptions) -> Result<Level, GenerateError> {
        let dims = options.grid.dims();
        let terminals = options.terminal_bounds();
        let inversions = options.inversion_bounds();
        let pair_count = self.rng.random_range(terminals.min..=terminals.max);
        let inverter_count = self.rng.random_range(inversions.min..=inversions.max);

        let mut builder = SquareBoardBuilder::with_dims(dims);

        let mut inverters = 0;
        for _ in 0..inverter_count {
            let spot = (0..PLACEMENT_ATTEMPTS)
                .map(|_| self.random_location(dims))
                .find(|location| builder.cell_at(*location) == Some(Cell::Empty));
            match spot {
                Some(location) => {
                    builder.add_inverter(location);
                    inverters += 1;
                }
                None => log::debug!("no room for another inverter, skipping it"),
            }
        }

        for (start_color, end_color) in self.pair_colors(pair_count, inverters > 0) {
            let start = self.place_terminal(&builder, Cell::Start { color: start_color }, dims)?;
            builder.add_start(start_color, start);
            let end = self.place_terminal(&builder, Cell::End { color: end_color }, dims)?;
            builder.add_end(end_color, end);
        }

        let board = builder.build().map_err(|reasons| GenerateError::InvalidBoard(reasons.clone()))?;
        Ok(Level::from(board))
    }

    /// Generate levels until one is solvable and its shorthand is not in `known`, trying at most `max_attempts` candidates.
    ///
    /// Returns the level along with the solution that proved it solvable.
    pub fn generate_solvable(&mut self, options: &GeneratorOptions, known: &HashSet<String>, max_attempts: usize) -> Result<(Level, Solution), GenerateError> {
        for attempt in 1..=max_attempts {
            let level = match self.generate_level(options) {
                Ok(level) => level,
                Err(GenerateError::PlacementExhausted) => {
                    log::debug!("attempt {}: could not place every terminal", attempt);
                    continue;
                }
                Err(other) => return Err(other),
            };

            if known.contains(level.shorthand()) {
                log::debug!("attempt {}: duplicate level {}", attempt, level.shorthand());
                continue;
            }

            match level.solve() {
                Ok(solution) => {
                    log::info!("generated level {} in {} attempts", level.shorthand(), attempt);
                    return Ok((level, solution));
                }
                Err(SolverFailure::Unsolvable) => log::debug!("attempt {}: level {} is unsolvable", attempt, level.shorthand()),
            }
        }

        Err(GenerateError::AttemptsExhausted(max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(w: usize, h: usize) -> (Dimension, Dimension) {
        (NonZero::new(w).unwrap(), NonZero::new(h).unwrap())
    }

    #[test]
    fn default_options() {
        let options = GeneratorOptions::default();
        assert_eq!(options.grid, Dimensions { width: 3, height: 3 });
        assert_eq!(options.terminal_bounds(), Bounds { min: 2, max: 2 });
        assert_eq!(options.inversion_bounds(), Bounds { min: 0, max: 0 });

        let options: GeneratorOptions = serde_json::from_str(r#"{"grid": {"width": 5, "height": 5}}"#).unwrap();
        assert_eq!(options.terminal_bounds(), Bounds { min: 2, max: 4 });

        let options: GeneratorOptions = serde_json::from_str(r#"{"grid": {"width": 8}, "inversions": {"max": 2}}"#).unwrap();
        assert_eq!(options.grid.dims(), dims(8, 3));
        assert_eq!(options.inversion_bounds(), Bounds { min: 0, max: 2 });
    }

    #[test]
    fn bounds_are_clamped() {
        let options = GeneratorOptions {
            terminals: BoundsOverride::exactly(5, 3),
            inversions: BoundsOverride { min: Some(4), max: None },
            ..Default::default()
        };
        assert_eq!(options.terminal_bounds(), Bounds { min: 3, max: 3 });
        assert_eq!(options.inversion_bounds(), Bounds { min: 0, max: 0 });

        // a 2x2 grid derives (2, 1)
        let options = GeneratorOptions { grid: Dimensions { width: 2, height: 2 }, ..Default::default() };
        assert_eq!(options.terminal_bounds(), Bounds { min: 1, max: 1 });
    }

    #[test]
    fn crowding() {
        let dims = dims(3, 3);
        let mut builder = SquareBoardBuilder::with_dims(dims);
        builder.add_start(Color::Red, Location(1, 0));
        // the corner between them would be boxed in
        assert!(!fits(&builder, Location(0, 1), Cell::End { color: Color::Red }, dims));
        assert!(fits(&builder, Location(1, 2), Cell::End { color: Color::Red }, dims));
        builder.add_end(Color::Red, Location(1, 2));
        // taken
        assert!(!fits(&builder, Location(1, 0), Cell::Start { color: Color::Blue }, dims));
        assert!(!fits(&builder, Location(0, 1), Cell::Start { color: Color::Blue }, dims));
        assert!(fits(&builder, Location(2, 0), Cell::Start { color: Color::Blue }, dims));

        // inverters do not crowd
        let mut builder = SquareBoardBuilder::with_dims(dims);
        builder.add_inverter(Location(1, 0)).add_inverter(Location(0, 1));
        assert!(fits(&builder, Location(0, 0), Cell::Start { color: Color::Blue }, dims));
    }

    #[test]
    fn first_pair_colors() {
        let mut generator = Generator::with_seed(7);
        for _ in 0..50 {
            let colors = generator.pair_colors(3, false);
            assert_eq!(colors.len(), 3);
            assert_eq!(colors[0].0, colors[0].1);
            assert!(colors.iter().all(|(start, end)| CHROMATIC.contains(start) && CHROMATIC.contains(end)));

            let (start, end) = generator.pair_colors(1, true)[0];
            assert!(end == start || end == negate(start));
        }
    }

    #[test]
    fn generated_levels_respect_options() {
        let options = GeneratorOptions {
            grid: Dimensions { width: 5, height: 5 },
            terminals: BoundsOverride::exactly(2, 3),
            inversions: BoundsOverride::exactly(1, 2),
        };
        let mut generator = Generator::with_seed(2025);

        let mut generated = 0;
        for _ in 0..20 {
            let Ok(level) = generator.generate_level(&options) else { continue };
            generated += 1;
            let board = level.board();
            let board_dims = board.dims();
            assert_eq!(board_dims, dims(5, 5));

            let starts = board.nodes().filter(|node| matches!(node.cell, Cell::Start { .. })).count();
            let ends = board.nodes().filter(|node| matches!(node.cell, Cell::End { .. })).count();
            let inverters = board.nodes().filter(|node| node.cell == Cell::Inverter).count();
            assert_eq!(starts, ends);
            assert!((2..=3).contains(&starts), "{starts} pairs");
            assert!((1..=2).contains(&inverters), "{inverters} inverters");

            // nothing ends up boxed in by terminals
            for node in board.nodes() {
                let crowd = SquareStep::neighbors_of(node.location, board_dims)
                    .into_iter()
                    .filter(|(_, neighbor)| board.cell_at(*neighbor).is_some_and(|cell| cell.is_terminal()))
                    .count();
                assert!(crowd < crowd_limit(node.location, board_dims), "{}", board);
            }
        }
        assert!(generated > 0);
    }

    #[test]
    fn seeded_generation_repeats() {
        let options = GeneratorOptions {
            grid: Dimensions { width: 4, height: 4 },
            ..Default::default()
        };
        let first = Generator::with_seed(99).generate_level(&options).map(|level| level.shorthand().to_owned());
        let second = Generator::with_seed(99).generate_level(&options).map(|level| level.shorthand().to_owned());
        assert_eq!(first, second);
    }

    #[test]
    fn crowded_grid_exhausts_placement() {
        // two pairs can never fit on a 2x2 grid
        let options = GeneratorOptions {
            grid: Dimensions { width: 2, height: 2 },
            terminals: BoundsOverride::exactly(2, 2),
            ..Default::default()
        };
        let mut generator = Generator::with_seed(1);
        assert_eq!(generator.generate_level(&options).unwrap_err(), GenerateError::PlacementExhausted);
        assert_eq!(
            generator.generate_solvable(&options, &HashSet::new(), 5).unwrap_err(),
            GenerateError::AttemptsExhausted(5),
        );
    }

    #[test]
    fn solvable_levels_are_new() {
        // one pair on a 2x2 grid always sits side by side and is always solvable
        let options = GeneratorOptions {
            grid: Dimensions { width: 2, height: 2 },
            terminals: BoundsOverride::exactly(1, 1),
            ..Default::default()
        };
        let mut generator = Generator::with_seed(5);
        let mut known = HashSet::new();

        let (level, solution) = generator.generate_solvable(&options, &known, 50).unwrap();
        assert_eq!(solution.colors.len(), 4);
        known.insert(level.shorthand().to_owned());

        let (other, _) = generator.generate_solvable(&options, &known, 200).unwrap();
        assert!(!known.contains(other.shorthand()));
    }
}
