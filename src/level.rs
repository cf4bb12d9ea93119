use std::num::NonZero;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::Board;
use crate::builder::{Builder, BuilderInvalidReason, SquareBoardBuilder};
use crate::cell::Cell;
use crate::color::Color;
use crate::location::Location;
use crate::solver::{Solution, SolverFailure};

/// Reasons a level record may be rejected.
#[derive(Debug, Error)]
pub enum LevelError {
    /// Text that should have read `"(x, y)"` did not.
    #[error("malformed position or size {0:?}")]
    MalformedTuple(String),
    /// The grid size had a zero width or height.
    #[error("grid dimensions must be non-zero")]
    ZeroDimension,
    /// A color label outside the palette.
    #[error("unknown color {0:?}")]
    UnknownColor(String),
    /// A cell `type` other than 0 to 3.
    #[error("unknown cell type {0}")]
    UnknownCellType(u8),
    /// A Start or End cell without a color.
    #[error("terminal cell has no color")]
    MissingColor,
    /// The cells do not fit the grid.
    #[error("cells do not fit the grid: {0:?}")]
    InvalidBoard(Vec<BuilderInvalidReason>),
    /// The text was not a level record at all.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One placed feature in a [`LevelRecord`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// `"(x, y)"`.
    pub position: String,
    /// 0 for empty, 1 for Start, 2 for End, 3 for an inverter.
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// A palette label, or empty for cells without a color.
    #[serde(default)]
    pub color: String,
}

/// The stored form of a level.
///
/// Any other fields present on input are ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    /// `"(width, height)"`.
    pub grid_size: String,
    /// Every non-empty cell; cells not listed are empty.
    #[serde(default)]
    pub cells: Vec<CellRecord>,
    /// Recomputed on load, so never trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shorthand: Option<String>,
}

/// A puzzle: a [`Board`] plus the fingerprint used to tell levels apart.
#[derive(Clone, Debug)]
pub struct Level {
    board: Board,
    shorthand: String,
}

fn parse_color(label: &str) -> Result<Option<Color>, LevelError> {
    if label.is_empty() {
        return Ok(None);
    }
    Color::from_str(label)
        .map(Some)
        .map_err(|_| LevelError::UnknownColor(label.to_owned()))
}

fn shorthand_of(board: &Board) -> String {
    let mut shorthand = String::new();
    for row in board.cells.rows() {
        for cell in row {
            match cell {
                Cell::Empty | Cell::Inverter => shorthand.push_str(&cell.kind_code().to_string()),
                Cell::Start { color } | Cell::End { color } => {
                    shorthand.push_str(&cell.kind_code().to_string());
                    shorthand.push(color.initial());
                }
            }
        }
    }
    shorthand
}

impl From<Board> for Level {
    fn from(board: Board) -> Self {
        let shorthand = shorthand_of(&board);
        Self { board, shorthand }
    }
}

impl Level {
    /// Build a level from its record. Any problem with the record is an error; nothing is defaulted.
    pub fn from_record(record: &LevelRecord) -> Result<Self, LevelError> {
        let Location(width, height) = Location::from_tuple_text(&record.grid_size)?;
        let dims = (
            NonZero::new(width).ok_or(LevelError::ZeroDimension)?,
            NonZero::new(height).ok_or(LevelError::ZeroDimension)?,
        );

        let mut builder = SquareBoardBuilder::with_dims(dims);
        for cell_record in &record.cells {
            let location = Location::from_tuple_text(&cell_record.position)?;
            let color = parse_color(&cell_record.color)?;
            match Cell::from_kind_code(cell_record.kind, color)? {
                Cell::Start { color } => builder.add_start(color, location),
                Cell::End { color } => builder.add_end(color, location),
                Cell::Inverter => builder.add_inverter(location),
                Cell::Empty => builder.clear_location(location),
            };
        }

        let board = builder.build().map_err(|reasons| LevelError::InvalidBoard(reasons.clone()))?;
        Ok(Self::from(board))
    }

    /// The record form of this level: non-empty cells in row-major order, with the shorthand.
    pub fn to_record(&self) -> LevelRecord {
        let (width, height) = self.board.dims();
        let cells = self.board.nodes()
            .filter(|node| node.cell != Cell::Empty)
            .map(|node| CellRecord {
                position: node.location.to_tuple_text(),
                kind: node.cell.kind_code(),
                color: node.cell.color().map(|color| color.to_string()).unwrap_or_default(),
            })
            .collect();

        LevelRecord {
            grid_size: Location(width.get(), height.get()).to_tuple_text(),
            cells,
            shorthand: Some(self.shorthand.clone()),
        }
    }

    /// Parse a JSON level record.
    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        let record: LevelRecord = serde_json::from_str(text)?;
        Self::from_record(&record)
    }

    /// Serialize the record form of this level.
    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string(&self.to_record())?)
    }

    /// The board this level was built into.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Row-major fingerprint of the cells: `0` for empty, `3` for an inverter, and the type code followed by the color initial for terminals.
    pub fn shorthand(&self) -> &str {
        &self.shorthand
    }

    /// Solve this level's board. See [`Board::solve`].
    pub fn solve(&self) -> Result<Solution, SolverFailure> {
        self.board.solve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST_LEVEL: &str = r#"{
        "cells": [
            {"color": "BLUE", "position": "(0, 0)", "type": 1},
            {"color": "RED", "position": "(1, 2)", "type": 1},
            {"color": "BLUE", "position": "(2, 0)", "type": 2},
            {"color": "RED", "position": "(1, 0)", "type": 2}
        ],
        "completed": true,
        "grid_size": "(4, 4)",
        "locked": false
    }"#;

    #[test]
    fn parse_record() {
        let level = Level::from_json(FIRST_LEVEL).unwrap();
        let board = level.board();
        assert_eq!(board.dims().0.get(), 4);
        assert_eq!(board.cell_at(Location(0, 0)), Some(Cell::Start { color: Color::Blue }));
        assert_eq!(board.cell_at(Location(1, 0)), Some(Cell::End { color: Color::Red }));
        assert_eq!(board.cell_at(Location(3, 3)), Some(Cell::Empty));
        assert_eq!(level.shorthand(), "1B2R2B0000001R000000");
    }

    #[test]
    fn record_survives_a_round_trip() {
        let level = Level::from_json(FIRST_LEVEL).unwrap();
        let again = Level::from_json(&level.to_json().unwrap()).unwrap();
        assert_eq!(again.shorthand(), level.shorthand());
        assert_eq!(again.to_record(), level.to_record());

        let record = level.to_record();
        assert_eq!(record.grid_size, "(4, 4)");
        // row-major
        assert_eq!(record.cells[0].position, "(0, 0)");
        assert_eq!(record.cells[1].position, "(1, 0)");
        assert_eq!(record.cells[3].position, "(1, 2)");
    }

    #[test]
    fn inverters_and_missing_type() {
        let level = Level::from_json(r#"{
            "grid_size": "(2, 1)",
            "cells": [{"position": "(1, 0)", "type": 3}, {"position": "(0, 0)", "color": "RED"}]
        }"#).unwrap();
        assert_eq!(level.shorthand(), "03");

        let record = level.to_record();
        assert_eq!(record.cells, vec![CellRecord { position: "(1, 0)".into(), kind: 3, color: String::new() }]);
    }

    #[test]
    fn reject_bad_records() {
        let cases = [
            (r#"{"grid_size": "(0, 3)"}"#, "zero"),
            (r#"{"grid_size": "3x3"}"#, "tuple"),
            (r#"{"grid_size": "(3, 3)", "cells": [{"position": "(0, 0)", "type": 1, "color": "MAUVE"}]}"#, "color"),
            (r#"{"grid_size": "(3, 3)", "cells": [{"position": "(0, 0)", "type": 2}]}"#, "missing"),
            (r#"{"grid_size": "(3, 3)", "cells": [{"position": "(0, 0)", "type": 7}]}"#, "type"),
            (r#"{"grid_size": "(3, 3)", "cells": [{"position": "(3, 0)", "type": 3}]}"#, "bounds"),
            (r#"{"cells": []}"#, "json"),
        ];

        for (text, expected) in cases {
            let err = Level::from_json(text).unwrap_err();
            let matched = match expected {
                "zero" => matches!(err, LevelError::ZeroDimension),
                "tuple" => matches!(err, LevelError::MalformedTuple(_)),
                "color" => matches!(err, LevelError::UnknownColor(_)),
                "missing" => matches!(err, LevelError::MissingColor),
                "type" => matches!(err, LevelError::UnknownCellType(7)),
                "bounds" => matches!(err, LevelError::InvalidBoard(_)),
                "json" => matches!(err, LevelError::Json(_)),
                _ => false,
            };
            assert!(matched, "{text}: {err:?}");
        }
    }
}
