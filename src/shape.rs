use std::hash::Hash;

use itertools::Itertools;
use strum::VariantArray;

use crate::location::{Dimension, Location};

/// Single steps between orthogonally adjacent cells.
pub trait Step: Sized + Copy + VariantArray + PartialEq + Eq + Hash + Ord + PartialOrd {
    /// Attempt the step from `location` in the direction specified by `self` and return the resultant [`Location`].
    ///
    /// Stepping off the top or left edge wraps to a huge coordinate, which no board contains.
    fn attempt_from(&self, location: Location) -> Location;
    /// The static array of all "forward" directions.
    ///
    /// Forward directions are those which, upon stepping from one location to another, cause the destination location to be indexed higher than the origin location in row-major order.
    const FORWARD_VARIANTS: &'static [Self];
}

/// The square cell type and rectangular board shape.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum SquareStep {
    Up,
    Down,
    Left,
    Right,
}

impl Step for SquareStep {
    fn attempt_from(&self, location: Location) -> Location {
        match self {
            Self::Up => location.offset_by((0, -1)),
            Self::Down => location.offset_by((0, 1)),
            Self::Left => location.offset_by((-1, 0)),
            Self::Right => location.offset_by((1, 0)),
        }
    }

    const FORWARD_VARIANTS: &'static [Self] = &[Self::Right, Self::Down];
}

/// Functionality on top of [`Step`] with identical implementation for every shape.
pub trait BoardShape: Step {
    /// Neighbors of `location` on a board of size `dims`, clipped at the boundary.
    fn neighbors_of(location: Location, dims: (Dimension, Dimension)) -> Vec<(Self, Location)>;
}

impl<Sh> BoardShape for Sh
where
    Sh: Step,
{
    fn neighbors_of(location: Location, dims: (Dimension, Dimension)) -> Vec<(Self, Location)> {
        Self::VARIANTS.iter()
            .map(|dir| (*dir, dir.attempt_from(location)))
            .filter(|(_, neighbor)| neighbor.within(dims))
            .collect_vec()
    }
}
