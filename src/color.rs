use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantArray};

/// The eight-label palette. Declaration order is palette order, which [`components`] relies on.
#[derive(Copy, Clone, Debug, Display, EnumString, VariantArray, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Color {
    Red,
    Blue,
    Yellow,
    Purple,
    Green,
    Orange,
    White,
    Black,
}

/// Colors a generated terminal may carry.
pub const CHROMATIC: [Color; 6] = [Color::Red, Color::Blue, Color::Yellow, Color::Purple, Color::Green, Color::Orange];

impl Color {
    /// Single-letter tag used by board printing and level shorthands.
    pub fn initial(&self) -> char {
        match self {
            Self::Red => 'R',
            Self::Blue => 'B',
            Self::Yellow => 'Y',
            Self::Purple => 'P',
            Self::Green => 'G',
            Self::Orange => 'O',
            Self::White => 'W',
            // B is taken
            Self::Black => 'K',
        }
    }
}

/// The color a path of color `color` takes on after passing through a cell showing `interpolator`.
pub fn derive(color: Color, interpolator: Color) -> Color {
    if color == interpolator || interpolator == Color::White {
        return color;
    }
    if color == Color::White {
        return interpolator;
    }

    match (color, interpolator) {
        (Color::Red, Color::Blue) | (Color::Blue, Color::Red) => Color::Purple,
        (Color::Blue, Color::Yellow) | (Color::Yellow, Color::Blue) => Color::Green,
        (Color::Red, Color::Yellow) | (Color::Yellow, Color::Red) => Color::Orange,
        _ => Color::Black,
    }
}

/// The color an inverter pairs with `color`. This is an involution.
pub fn negate(color: Color) -> Color {
    match color {
        Color::Red => Color::Green,
        Color::Blue => Color::Orange,
        Color::Yellow => Color::Purple,
        Color::Green => Color::Red,
        Color::Purple => Color::Yellow,
        Color::Orange => Color::Blue,
        Color::Black => Color::White,
        Color::White => Color::Black,
    }
}

/// Colors that `color` decomposes into; empty for primaries and white.
///
/// Black decomposes into every other palette entry, white included.
pub fn components(color: Color) -> &'static [Color] {
    match color {
        Color::Green => &[Color::Yellow, Color::Blue],
        Color::Purple => &[Color::Blue, Color::Red],
        Color::Orange => &[Color::Yellow, Color::Red],
        Color::Black => &Color::VARIANTS[..7],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::VariantArray;

    use super::*;

    #[test]
    fn derive_identities() {
        for &c in Color::VARIANTS {
            assert_eq!(derive(c, c), c);
            assert_eq!(derive(c, Color::White), c);
            assert_eq!(derive(Color::White, c), c);
        }
    }

    #[test]
    fn derive_secondaries() {
        assert_eq!(derive(Color::Red, Color::Blue), Color::Purple);
        assert_eq!(derive(Color::Blue, Color::Red), Color::Purple);
        assert_eq!(derive(Color::Yellow, Color::Blue), Color::Green);
        assert_eq!(derive(Color::Red, Color::Yellow), Color::Orange);
        // anything undefined collapses to black
        assert_eq!(derive(Color::Red, Color::Green), Color::Black);
        assert_eq!(derive(Color::Purple, Color::Orange), Color::Black);
    }

    #[test]
    fn negate_is_involution() {
        for &c in Color::VARIANTS {
            assert_eq!(negate(negate(c)), c);
            assert_ne!(negate(c), c);
        }
        assert_eq!(negate(Color::Red), Color::Green);
        assert_eq!(negate(Color::Black), Color::White);
    }

    #[test]
    fn black_components_include_white() {
        // black is a catch-all: it lists white but never itself
        let parts = components(Color::Black);
        assert_eq!(parts.len(), 7);
        assert!(!parts.contains(&Color::Black));
        assert!(parts.contains(&Color::White));
    }

    #[test]
    fn primary_components_are_empty() {
        for c in [Color::Red, Color::Blue, Color::Yellow, Color::White] {
            assert!(components(c).is_empty());
        }
        assert_eq!(components(Color::Green), &[Color::Yellow, Color::Blue]);
    }

    #[test]
    fn labels() {
        assert_eq!(Color::Purple.to_string(), "PURPLE");
        assert_eq!(Color::from_str("ORANGE").unwrap(), Color::Orange);
        assert!(Color::from_str("GRAY").is_err());
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "\"WHITE\"");
    }
}
