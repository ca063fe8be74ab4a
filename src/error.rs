//! Error types for the position-string and configuration collaborators.
//!
//! Rules-level failures (illegal moves, off-board lookups) are not errors:
//! they surface as `false` or `None` from the board itself.

use thiserror::Error;

use crate::piece::Color;

/// Errors produced while parsing a position string or a square coordinate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("expected 4 to 6 space-separated fields, found {0}")]
    FieldCount(usize),

    #[error("piece placement must have 8 ranks, found {0}")]
    RankCount(usize),

    #[error("rank {rank} does not describe exactly 8 squares")]
    RankWidth { rank: usize },

    #[error("unknown piece character '{0}'")]
    UnknownPiece(char),

    #[error("invalid side to move '{0}'")]
    SideToMove(String),

    #[error("invalid castling field '{0}'")]
    Castling(String),

    #[error("invalid en passant field '{0}'")]
    EnPassant(String),

    #[error("invalid {field} counter '{value}'")]
    Counter { field: &'static str, value: String },

    #[error("invalid square coordinate '{0}'")]
    Square(String),

    #[error("expected exactly one {color} king, found {count}")]
    KingCount { color: Color, count: usize },
}

/// Errors produced while loading an [`AiConfig`](crate::engine::AiConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}
