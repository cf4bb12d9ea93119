use crate::color::Color;
use crate::level::LevelError;

/// What occupies a single grid cell before solving.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Cell {
    /// Origin of a path, which carries this cell's location as its root.
    #[allow(missing_docs)]
    Start { color: Color },
    /// Where a path must arrive, in this color.
    #[allow(missing_docs)]
    End { color: Color },
    /// Pairs every incident colored edge with one of the negated color.
    Inverter,
    /// To be filled in by the solver.
    #[default]
    Empty,
}

impl Cell {
    /// The numeric `type` used by level records.
    pub fn kind_code(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Start { .. } => 1,
            Self::End { .. } => 2,
            Self::Inverter => 3,
        }
    }

    /// Rebuild a cell from its record `type` and color.
    ///
    /// Terminals must carry a color; any color given to an empty or inverter cell is ignored.
    pub fn from_kind_code(code: u8, color: Option<Color>) -> Result<Self, LevelError> {
        Ok(match code {
            0 => Self::Empty,
            1 => Self::Start { color: color.ok_or(LevelError::MissingColor)? },
            2 => Self::End { color: color.ok_or(LevelError::MissingColor)? },
            3 => Self::Inverter,
            other => return Err(LevelError::UnknownCellType(other)),
        })
    }

    /// The fixed color of a terminal.
    pub fn color(&self) -> Option<Color> {
        match self {
            Self::Start { color } | Self::End { color } => Some(*color),
            _ => None,
        }
    }

    /// Start or End.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Start { .. } | Self::End { .. })
    }
}
