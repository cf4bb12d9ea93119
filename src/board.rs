use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;
use petgraph::graphmap::UnGraphMap;
use unordered_pair::UnorderedPair;

use crate::cell::Cell;
use crate::location::{Dimension, Location};
use crate::solver::{GraphSolver, Solution, SolverFailure};

/// A graph vertex: one per cell.
#[derive(Copy, Clone, Hash, PartialEq, Eq, Ord, PartialOrd, Debug)]
pub struct Node {
    #[allow(missing_docs)]
    pub location: Location,
    #[allow(missing_docs)]
    pub cell: Cell,
}

/// Canonical, order-independent name of the edge between two adjacent locations.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct EdgeKey {
    low: Location,
    high: Location,
}

impl EdgeKey {
    /// The edge between `a` and `b`, in either order.
    pub fn new(a: Location, b: Location) -> Self {
        Self { low: a.min(b), high: a.max(b) }
    }

    /// Both ends, lower first.
    pub fn endpoints(&self) -> (Location, Location) {
        (self.low, self.high)
    }

    /// Whether `location` is an end of this edge.
    pub fn touches(&self, location: Location) -> bool {
        self.low == location || self.high == location
    }

    /// The endpoint that is not `location`.
    pub fn other(&self, location: Location) -> Location {
        if self.low == location { self.high } else { self.low }
    }
}

impl From<UnorderedPair<Location>> for EdgeKey {
    fn from(value: UnorderedPair<Location>) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<(Node, Node, &())> for EdgeKey {
    fn from(value: (Node, Node, &())) -> Self {
        Self::from(UnorderedPair::from((value.0.location, value.1.location)))
    }
}

// "e_CELLx,y_CELLx,y", the key format of solution records; the cell names are in text order,
// so (9, 0) comes after (10, 0)
impl Display for EdgeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (first, second) = [self.low, self.high]
            .map(|cell| format!("CELL{}", cell))
            .into_iter()
            .sorted()
            .collect_tuple()
            .ok_or(std::fmt::Error)?;
        write!(f, "e_{}_{}", first, second)
    }
}

/// A rectangular board as an undirected graph of cells.
///
/// [`Board`]s should be built using a [`Builder`](crate::builder::Builder) such as [`SquareBoardBuilder`](crate::builder::SquareBoardBuilder),
/// or parsed from a [`Level`](crate::Level) record.
#[derive(Clone, Debug)]
pub struct Board {
    pub(crate) graph: UnGraphMap<Node, ()>,
    pub(crate) dims: (Dimension, Dimension),
    pub(crate) cells: Array2<Cell>,
}

impl Board {
    /// Width and height, in that order.
    pub fn dims(&self) -> (Dimension, Dimension) {
        self.dims
    }

    /// The cell at `location`, if it is on the board.
    pub fn cell_at(&self, location: Location) -> Option<Cell> {
        self.cells.get(location.as_index()).copied()
    }

    #[allow(missing_docs)]
    pub fn node_at(&self, location: Location) -> Option<Node> {
        self.cell_at(location).map(|cell| Node { location, cell })
    }

    /// All cells in row-major order.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.cells.indexed_iter().map(|(index, cell)| Node { location: Location::from(index), cell: *cell })
    }

    /// Every edge, each exactly once.
    pub fn edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.graph.all_edges().map(EdgeKey::from)
    }

    /// Edges touching `location`, in a fixed order.
    pub fn incident_edges(&self, location: Location) -> Vec<EdgeKey> {
        match self.node_at(location) {
            Some(node) => self.graph.edges(node).map(EdgeKey::from).collect_vec(),
            None => Vec::new(),
        }
    }

    /// Locations of all Start cells in row-major order; these are the roots a solution may assign.
    pub fn starts(&self) -> Vec<Location> {
        self.nodes()
            .filter(|node| matches!(node.cell, Cell::Start { .. }))
            .map(|node| node.location)
            .collect_vec()
    }

    /// Solve this board with a fresh [`GraphSolver`].
    ///
    /// Returns according to the result of [`GraphSolver::solve`].
    pub fn solve(&self) -> Result<Solution, SolverFailure> {
        GraphSolver::from(self).solve()
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for row in self.cells.rows() {
            for cell in row {
                write!(f, "{}", match cell {
                    Cell::Start { color } => color.initial(),
                    Cell::End { color } => color.initial().to_ascii_lowercase(),
                    Cell::Inverter => '~',
                    Cell::Empty => '.',
                })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
