use std::fmt::{Display, Formatter};
use std::num::NonZero;

use ndarray::Ix;

use crate::level::LevelError;

pub(crate) type Coord = usize;
/// A grid dimension; boards are never empty.
pub type Dimension = NonZero<Coord>;

/// A location `(x, y)` on a board. The top left corner is `Location(0, 0)`.
#[derive(Clone, Eq, Hash, Copy, PartialEq, Ord, PartialOrd, Debug)]
pub struct Location(pub Coord, pub Coord);

impl Location {
    pub(crate) fn as_index(&self) -> (Coord, Coord) {
        (self.1, self.0)
    }

    pub(crate) fn offset_by(self, rhs: (isize, isize)) -> Self {
        Self(self.0.wrapping_add_signed(rhs.0), self.1.wrapping_add_signed(rhs.1))
    }

    pub(crate) fn within(&self, dims: (Dimension, Dimension)) -> bool {
        self.0 < dims.0.get() && self.1 < dims.1.get()
    }

    /// Parse the `"(x, y)"` text used by level records.
    ///
    /// Surrounding whitespace and whitespace around either number is ignored; anything else that does not
    /// look like a parenthesized pair of unsigned integers is a [`LevelError::MalformedTuple`].
    pub fn from_tuple_text(text: &str) -> Result<Self, LevelError> {
        let malformed = || LevelError::MalformedTuple(text.to_owned());

        let inner = text.trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let (x, y) = inner.split_once(',').ok_or_else(malformed)?;

        Ok(Self(
            x.trim().parse().map_err(|_| malformed())?,
            y.trim().parse().map_err(|_| malformed())?,
        ))
    }

    /// The inverse of [`Self::from_tuple_text`].
    pub fn to_tuple_text(&self) -> String {
        format!("({}, {})", self.0, self.1)
    }
}

impl From<(Ix, Ix)> for Location {
    fn from(value: (Ix, Ix)) -> Self {
        Self(value.1, value.0)
    }
}

// "x,y", the key format of solution records
impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tuple_text() {
        assert_eq!(Location::from_tuple_text("(1, 2)").unwrap(), Location(1, 2));
        assert_eq!(Location::from_tuple_text("  (10,0) ").unwrap(), Location(10, 0));
        assert_eq!(Location::from_tuple_text("( 3 , 4 )").unwrap(), Location(3, 4));
        assert_eq!(Location::from_tuple_text(&Location(7, 5).to_tuple_text()).unwrap(), Location(7, 5));
    }

    #[test]
    fn reject_malformed_tuple_text() {
        for text in ["1, 2", "(1 2)", "(1, 2", "(a, 2)", "(-1, 2)", "", "(1, 2, 3)"] {
            assert!(matches!(Location::from_tuple_text(text), Err(LevelError::MalformedTuple(_))), "{text}");
        }
    }

    #[test]
    fn index_order() {
        assert_eq!(Location(2, 5).as_index(), (5, 2));
        assert_eq!(Location::from((5, 2)), Location(2, 5));
    }
}
