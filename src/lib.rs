#![warn(missing_docs)]

//! # `polychrome`
//!
//! A solver and generator for grid puzzles in which colored paths run from Start cells to End cells, mixing as they cross and flipping through inverters.
//! Begin by building a board using a builder such as [`SquareBoardBuilder`](builder::SquareBoardBuilder), or by parsing a [`Level`] from its JSON record.
//! Then call [`solve()`](crate::Board::solve), yielding a [`Solution`] that colors every cell and every used edge.
//! Random levels come from a [`Generator`], which keeps only those the solver accepts.
//!
//! # Internals
//! This crate is driven by expressing the problem as a Boolean satisfiability problem (a "SAT"), extracting information from that solver, and reading the solution back onto the board.
//!
//! A high level overview is as follows:
//!
//! Given input, express the board as an undirected graph G. A vertex corresponds to a cell and edges join orthogonal neighbors.
//!
//! We make the following assertions in SAT form:
//! 1. Every cell shows exactly one [`Color`], except inverters, which show none.
//! Terminals show their own color and have exactly one colored incident edge.
//! Any other cell has its color on at least two incident edges.
//! 2. Every edge carries exactly one color or none. A colored edge belongs to exactly one "root", the Start cell its path descends from.
//! 3. A colored edge entering a cell must leave it again, mixed against the cell's color, split into its components, or negated by an inverter, on the same root.
//!
//! These rules are local, so a solution may contain a path that loops back on itself and connects to nothing.
//! Such loops are found after solving and forbidden, and the problem is solved again until none remain.

pub use board::{Board, EdgeKey, Node};
pub use builder::Builder;
pub use cell::Cell;
pub use color::Color;
pub use generator::{GenerateError, Generator, GeneratorOptions};
pub use level::{CellRecord, Level, LevelError, LevelRecord};
pub use location::{Dimension, Location};
pub use solver::{GraphSolver, Solution, SolutionRecord, SolverFailure, REFINEMENT_LIMIT};

pub(crate) mod board;
pub mod builder;
pub(crate) mod cell;
pub mod color;
pub(crate) mod encoder;
pub mod generator;
pub(crate) mod level;
pub(crate) mod location;
pub mod logic;
pub mod shape;
pub(crate) mod solver;
