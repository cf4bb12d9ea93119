use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use varisat::Lit;

use crate::board::{Board, EdgeKey};
use crate::color::Color;
use crate::encoder::{edge_root, Atom, Encoder, Theory};
use crate::location::Location;
use crate::logic::{not, or, Model};

/// Re-solves allowed after the first model before a board is given up on.
pub const REFINEMENT_LIMIT: usize = 100;

/// Reasons a [`GraphSolver`] may fail.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum SolverFailure {
    /// No assignment satisfies the rules without some path closing on itself,
    /// or none was found within [`REFINEMENT_LIMIT`] re-solves.
    #[error("board has no solution")]
    Unsolvable,
}

/// A set of edges on one root that close a cycle, as found in some model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RootCycle {
    pub(crate) root: Location,
    /// Every edge on `root` between two cells of the walk that found the cycle.
    pub(crate) edges: Vec<EdgeKey>,
}

// depth-first walk that stops at the first revisit; `visited` holds the current walk when it returns true
fn walk(
    adjacency: &BTreeMap<Location, Vec<Location>>,
    node: Location,
    parent: Option<Location>,
    cleared: &HashSet<Location>,
    visited: &mut HashSet<Location>,
    entered: &mut HashSet<Location>,
) -> bool {
    if !visited.insert(node) {
        return true;
    }
    entered.insert(node);

    for next in adjacency.get(&node).into_iter().flatten() {
        if Some(*next) == parent || cleared.contains(next) {
            continue;
        }
        if walk(adjacency, *next, Some(node), cleared, visited, entered) {
            return true;
        }
    }

    visited.remove(&node);
    false
}

/// Find a cycle among the edges carried by any single root.
///
/// Roots are tried in order. Cells reached by a walk that found no cycle are not walked from again for that root.
pub(crate) fn find_root_cycle(edges_by_root: &BTreeMap<Location, Vec<EdgeKey>>) -> Option<RootCycle> {
    for (root, edges) in edges_by_root {
        let mut adjacency: BTreeMap<Location, Vec<Location>> = BTreeMap::new();
        for edge in edges {
            let (low, high) = edge.endpoints();
            adjacency.entry(low).or_default().push(high);
            adjacency.entry(high).or_default().push(low);
        }

        let mut cleared = HashSet::new();
        for start in adjacency.keys() {
            if cleared.contains(start) {
                continue;
            }

            let mut visited = HashSet::new();
            let mut entered = HashSet::new();
            if walk(&adjacency, *start, None, &cleared, &mut visited, &mut entered) {
                let edges = edges.iter()
                    .filter(|edge| {
                        let (low, high) = edge.endpoints();
                        visited.contains(&low) && visited.contains(&high)
                    })
                    .copied()
                    .collect_vec();
                return Some(RootCycle { root: *root, edges });
            }
            cleared.extend(entered);
        }
    }

    None
}

/// The colored edges of each root in `model`.
pub(crate) fn edges_by_root(model: &Model<Atom>) -> BTreeMap<Location, Vec<EdgeKey>> {
    let mut by_root: BTreeMap<Location, Vec<EdgeKey>> = BTreeMap::new();
    for atom in model.true_atoms() {
        if let Atom::EdgeRoot { edge, root } = atom {
            if !model.contains(&Atom::EdgeColor { edge: *edge, color: None }) {
                by_root.entry(*root).or_default().push(*edge);
            }
        }
    }
    by_root
}

/// Solves one [`Board`].
/// Use [`Self::solve`] to attempt to find a solution.
///
/// The clauses themselves come from the encoder; this drives the refinement that the clauses alone cannot express:
/// every path must be a tree hanging off its Start cell, never a loop.
pub struct GraphSolver<'b> {
    board: &'b Board,
}

impl<'b> From<&'b Board> for GraphSolver<'b> {
    fn from(board: &'b Board) -> Self {
        Self { board }
    }
}

impl GraphSolver<'_> {
    /// The full theory of the board, with no cycle ever blocked.
    pub(crate) fn theory(&self) -> Theory {
        let mut theory = Theory::new();
        Encoder::new(self.board).encode(&mut theory);
        log::debug!(
            "encoded {}x{} board: {} variables, {} clauses",
            self.board.dims.0, self.board.dims.1, theory.var_count(), theory.clause_count(),
        );
        theory
    }

    /// Solve the board, returning [`Ok`] with a [`Solution`] or [`Err`] with a [`SolverFailure`].
    ///
    /// # Refinement
    /// A model may route part of a root's edges around a closed loop, which is consistent with every local rule.
    /// When that happens, the edges of the loop are blocked from all sharing any one root again and the theory is re-solved.
    /// Blocks accumulate, so no loop found earlier can come back.
    pub fn solve(&self) -> Result<Solution, SolverFailure> {
        let mut theory = self.theory();
        let mut model = theory.solve().ok_or(SolverFailure::Unsolvable)?;
        let roots = self.board.starts();
        let mut blocks: Vec<Lit> = Vec::new();
        let mut rounds = 0;

        while let Some(cycle) = find_root_cycle(&edges_by_root(&model)) {
            if rounds == REFINEMENT_LIMIT {
                log::warn!("still finding cycles after {} re-solves, giving up", REFINEMENT_LIMIT);
                return Err(SolverFailure::Unsolvable);
            }
            if cycle.edges.is_empty() {
                return Err(SolverFailure::Unsolvable);
            }
            rounds += 1;

            log::debug!("round {}: blocking a {}-edge cycle found on root {}", rounds, cycle.edges.len(), cycle.root);
            // no root may carry all of these edges
            for root in &roots {
                let block = or(cycle.edges.iter().map(|edge| not(edge_root(*edge, *root))));
                blocks.push(theory.literal(&block));
            }

            model = theory.solve_assuming(&blocks).ok_or(SolverFailure::Unsolvable)?;
        }

        log::debug!("solved after {} re-solves", rounds);
        Ok(Solution::from_model(&model))
    }
}

/// A solved board: the color of every cell, and the color and root of every colored edge.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Solution {
    /// Color shown by each non-inverter cell.
    pub colors: BTreeMap<Location, Color>,
    /// Color carried by each colored edge. Uncolored edges are absent.
    pub edges: BTreeMap<EdgeKey, Color>,
    /// Start cell each colored edge descends from.
    pub roots: BTreeMap<EdgeKey, Location>,
}

/// A [`Solution`] keyed by text, as stored alongside levels.
///
/// Cells are keyed `"x,y"`, edges `"e_CELLx,y_CELLx,y"`, and roots are named `"CELLx,y"`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    /// See [`Solution::colors`].
    pub colors: BTreeMap<String, Color>,
    /// See [`Solution::edges`].
    pub edges: BTreeMap<String, Color>,
    /// See [`Solution::roots`].
    pub roots: BTreeMap<String, String>,
}

impl Solution {
    fn from_model(model: &Model<Atom>) -> Self {
        let mut solution = Self::default();
        for atom in model.true_atoms() {
            match *atom {
                Atom::CellColor { cell, color } => {
                    solution.colors.insert(cell, color);
                }
                Atom::EdgeColor { edge, color: Some(color) } => {
                    solution.edges.insert(edge, color);
                }
                Atom::EdgeRoot { edge, root } if !model.contains(&Atom::EdgeColor { edge, color: None }) => {
                    solution.roots.insert(edge, root);
                }
                Atom::EdgeRoot { .. } | Atom::EdgeColor { color: None, .. } | Atom::CellInvert { .. } => {}
            }
        }
        solution
    }

    /// The color shown at `location`, or [`None`] for an inverter.
    pub fn color_at(&self, location: Location) -> Option<Color> {
        self.colors.get(&location).copied()
    }

    /// The color carried by `edge`, or [`None`] if it is unused.
    pub fn edge_color(&self, edge: EdgeKey) -> Option<Color> {
        self.edges.get(&edge).copied()
    }

    /// The Start cell `edge` descends from, or [`None`] if it is unused.
    pub fn root_of(&self, edge: EdgeKey) -> Option<Location> {
        self.roots.get(&edge).copied()
    }

    /// Every edge descending from the Start cell at `root`.
    pub fn edges_of_root(&self, root: Location) -> Vec<EdgeKey> {
        self.roots.iter()
            .filter(|(_, owner)| **owner == root)
            .map(|(edge, _)| *edge)
            .collect_vec()
    }

    /// Whether any root's edges close a loop. Never true of a solution returned by [`GraphSolver::solve`].
    pub fn has_cycle(&self) -> bool {
        let mut by_root: BTreeMap<Location, Vec<EdgeKey>> = BTreeMap::new();
        for (edge, root) in &self.roots {
            by_root.entry(*root).or_default().push(*edge);
        }
        find_root_cycle(&by_root).is_some()
    }

    /// Follow the path out of the Start cell at `start`, for as long as it does not branch.
    ///
    /// The returned cells begin with `start`. The walk ends where no unvisited cell continues the root,
    /// or just before a cell where the path splits.
    pub fn walk_from(&self, start: Location) -> Vec<Location> {
        let owned = self.edges_of_root(start);
        let mut path = vec![start];
        let mut current = start;

        loop {
            let next = owned.iter()
                .filter(|edge| edge.touches(current))
                .map(|edge| edge.other(current))
                .filter(|cell| !path.contains(cell))
                .collect_vec();
            match next.as_slice() {
                [single] => {
                    path.push(*single);
                    current = *single;
                }
                _ => return path,
            }
        }
    }

    /// The text-keyed form of this solution.
    pub fn to_record(&self) -> SolutionRecord {
        SolutionRecord {
            colors: self.colors.iter().map(|(cell, color)| (cell.to_string(), *color)).collect(),
            edges: self.edges.iter().map(|(edge, color)| (edge.to_string(), *color)).collect(),
            roots: self.roots.iter().map(|(edge, root)| (edge.to_string(), format!("CELL{}", root))).collect(),
        }
    }
}
