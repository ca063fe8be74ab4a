pub mod board;
pub mod engine;
pub mod error;
pub mod fen;
pub mod movegen;
pub mod moves;
pub mod piece;
pub mod square;

#[cfg(target_arch = "wasm32")]
mod wasm_api;

pub use board::{Board, Outcome};
pub use engine::{AiConfig, PickResult, Policy, Weights};
pub use error::{ConfigError, PositionError};
pub use moves::Move;
pub use piece::{Color, Piece, PieceId, PieceType};
pub use square::{Coord, Square};
