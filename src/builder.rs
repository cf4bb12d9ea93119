use std::num::NonZero;
use std::ops::IndexMut;

use ndarray::{Array2, AssignElem};
use petgraph::graphmap::UnGraphMap;
use thiserror::Error;

use crate::board::{Board, Node};
use crate::cell::Cell;
use crate::color::Color;
use crate::location::{Dimension, Location};
use crate::shape::{SquareStep, Step};

/// Reasons a builder may become invalid while building.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum BuilderInvalidReason {
    /// A feature was placed outside the bounds specified by `dims` on a builder.
    #[error("feature placed outside the board")]
    FeatureOutOfBounds,
}

/// Functionality all builders must implement.
///
/// Builders mutate themselves while building but can be [`Clone`]d to save their state at some point.
/// Placing a feature where another one already is replaces it.
pub trait Builder: Clone {
    /// Construct a new [`Self`] with the specified dimensions, specified in `(x, y)` order.
    fn with_dims(dims: (Dimension, Dimension)) -> Self;
    /// Place a path origin.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if `location` is out of bounds.
    /// If the builder is already in an invalid state, this function does nothing.
    fn add_start(&mut self, color: Color, location: Location) -> &mut Self;
    /// Place a path destination, with the same conditions as [`Self::add_start`].
    fn add_end(&mut self, color: Color, location: Location) -> &mut Self;
    /// Shorthand for [`Self::add_start`] followed by [`Self::add_end`].
    fn add_termini(&mut self, colors: (Color, Color), locations: (Location, Location)) -> &mut Self {
        self.add_start(colors.0, locations.0).add_end(colors.1, locations.1)
    }
    /// Place an inverter, with the same conditions as [`Self::add_start`].
    fn add_inverter(&mut self, location: Location) -> &mut Self;
    /// Remove whatever feature is at `location`, with the same conditions as [`Self::add_start`].
    fn clear_location(&mut self, location: Location) -> &mut Self;
    /// Check the validity of this builder, ensuring no [`BuilderInvalidReason`] condition has arisen.
    ///
    /// Returns `None` if the builder is valid, `Some(&Vec<BuilderInvalidReason>)` otherwise.
    fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>>;
    /// Convert the state of this builder into a [`Board`].
    /// If the builder is invalid for any reason, a reference to a [`Vec`] of [`BuilderInvalidReason`] will indicate why.
    fn build(&self) -> Result<Board, &Vec<BuilderInvalidReason>>;
}

/// A builder for rectangular boards with square cells.
#[derive(Clone, Debug)]
pub struct SquareBoardBuilder {
    // width, height
    dims: (Dimension, Dimension),
    cells: Array2<Cell>,
    invalid_reasons: Vec<BuilderInvalidReason>,
}

impl Default for SquareBoardBuilder {
    fn default() -> Self {
        Self::with_dims((NonZero::<usize>::MIN.saturating_add(2), NonZero::<usize>::MIN.saturating_add(2)))
    }
}

impl SquareBoardBuilder {
    fn place(&mut self, location: Location, cell: Cell) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !location.within(self.dims) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        self.cells.index_mut(location.as_index()).assign_elem(cell);
        self
    }

    /// What has been placed at `location` so far.
    pub fn cell_at(&self, location: Location) -> Option<Cell> {
        self.cells.get(location.as_index()).copied()
    }
}

impl Builder for SquareBoardBuilder {
    fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            cells: Array2::from_shape_simple_fn((dims.1.get(), dims.0.get()), Cell::default),
            invalid_reasons: Default::default(),
        }
    }

    fn add_start(&mut self, color: Color, location: Location) -> &mut Self {
        self.place(location, Cell::Start { color })
    }

    fn add_end(&mut self, color: Color, location: Location) -> &mut Self {
        self.place(location, Cell::End { color })
    }

    fn add_inverter(&mut self, location: Location) -> &mut Self {
        self.place(location, Cell::Inverter)
    }

    fn clear_location(&mut self, location: Location) -> &mut Self {
        self.place(location, Cell::Empty)
    }

    fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    fn build(&self) -> Result<Board, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        let mut graph = UnGraphMap::with_capacity(
            self.cells.len(),
            // "horizontal" edges
            (self.dims.0.get() - 1) * self.dims.1.get()
                // "vertical" edges
                + (self.dims.1.get() - 1) * self.dims.0.get(),
        );

        let nodes = Array2::from_shape_fn(self.cells.raw_dim(), |ind| Node {
            location: Location::from(ind),
            cell: self.cells[ind],
        });

        for y in 0..self.dims.1.get() {
            for x in 0..self.dims.0.get() {
                let location = Location(x, y);
                let node = nodes[location.as_index()];
                // isolated cells (a 1x1 board) still need a vertex
                graph.add_node(node);

                // add edges to the right and down, if possible
                for direction in SquareStep::FORWARD_VARIANTS {
                    let neighbor = direction.attempt_from(location);
                    if let Some(other_node) = nodes.get(neighbor.as_index()) {
                        graph.add_edge(node, *other_node, ());
                    }
                }
            }
        }

        Ok(Board {
            graph,
            dims: self.dims,
            cells: self.cells.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;
    use crate::board::EdgeKey;

    fn dims(w: usize, h: usize) -> (Dimension, Dimension) {
        (NonZero::new(w).unwrap(), NonZero::new(h).unwrap())
    }

    #[test]
    fn grid_graph_shape() {
        let board = SquareBoardBuilder::with_dims(dims(4, 3)).build().unwrap();
        assert_eq!(board.graph.node_count(), 12);
        assert_eq!(board.edges().count(), 3 * 3 + 2 * 4);
        assert_eq!(board.incident_edges(Location(0, 0)).len(), 2);
        assert_eq!(board.incident_edges(Location(1, 0)).len(), 3);
        assert_eq!(board.incident_edges(Location(1, 1)).len(), 4);
        // no wraparound
        assert!(!board.edges().contains(&EdgeKey::new(Location(0, 0), Location(3, 0))));
    }

    #[test]
    fn edge_keys_are_order_independent() {
        let board = SquareBoardBuilder::with_dims(dims(2, 2)).build().unwrap();
        let key = EdgeKey::new(Location(1, 0), Location(0, 0));
        assert_eq!(key, EdgeKey::new(Location(0, 0), Location(1, 0)));
        assert!(board.incident_edges(Location(1, 0)).contains(&key));
        assert!(board.incident_edges(Location(0, 0)).contains(&key));
        assert_eq!(key.other(Location(1, 0)), Location(0, 0));
        assert_eq!(key.to_string(), "e_CELL0,0_CELL1,0");
    }

    #[test]
    fn edge_key_names_sort_as_text() {
        let key = EdgeKey::new(Location(9, 0), Location(10, 0));
        assert_eq!(key.endpoints(), (Location(9, 0), Location(10, 0)));
        assert_eq!(key.to_string(), "e_CELL10,0_CELL9,0");
        assert_eq!(EdgeKey::new(Location(3, 12), Location(3, 11)).to_string(), "e_CELL3,11_CELL3,12");
    }

    #[test]
    fn out_of_bounds_invalidates() {
        let mut builder = SquareBoardBuilder::with_dims(dims(3, 3));
        builder.add_start(Color::Red, Location(3, 0))
            .add_end(Color::Red, Location(0, 0));
        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::FeatureOutOfBounds]));
        // later features are ignored once invalid
        assert_eq!(builder.cell_at(Location(0, 0)), Some(Cell::Empty));
        assert!(builder.build().is_err());
    }

    #[test]
    fn display() {
        let board = SquareBoardBuilder::with_dims(dims(3, 2))
            .add_termini((Color::Blue, Color::Green), (Location(0, 0), Location(2, 1)))
            .add_inverter(Location(1, 1))
            .build()
            .unwrap();

        assert_eq!(format!("{}", board), "B..
.~g
");
        assert_eq!(board.starts(), vec![Location(0, 0)]);
    }
}
