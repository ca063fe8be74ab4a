use std::fmt;

use serde::{Deserialize, Serialize};

use crate::square::Coord;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Direction pawns of this color advance along the y axis.
    pub fn forward(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn back_rank(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    pub fn pawn_rank(self) -> usize {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    pub fn promotion_rank(self) -> usize {
        self.opposite().back_rank()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
const ALL_DIRECTIONS: [(i32, i32); 8] = [
    (1, 0), (0, 1), (-1, 0), (0, -1),
    (1, 1), (-1, 1), (1, -1), (-1, -1),
];
const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (2, 1), (-2, 1), (2, -1), (-2, -1),
    (1, 2), (-1, 2), (1, -2), (-1, -2),
];

impl PieceType {
    /// Movement vectors. Pawns have none here; their moves depend on color
    /// and occupancy and are generated separately.
    pub fn vectors(self) -> &'static [(i32, i32)] {
        match self {
            PieceType::Pawn => &[],
            PieceType::Knight => &KNIGHT_JUMPS,
            PieceType::Bishop => &DIAGONAL,
            PieceType::Rook => &ORTHOGONAL,
            PieceType::Queen | PieceType::King => &ALL_DIRECTIONS,
        }
    }

    /// Whether the vectors are walked until blocked rather than taken once.
    pub fn slides(self) -> bool {
        matches!(self, PieceType::Bishop | PieceType::Rook | PieceType::Queen)
    }

    /// Standard material values in pawns. The king has none since losing it
    /// is scored as a terminal state.
    pub fn value(self) -> f64 {
        match self {
            PieceType::Pawn => 1.0,
            PieceType::Knight => 3.0,
            PieceType::Bishop => 3.0,
            PieceType::Rook => 5.0,
            PieceType::Queen => 9.0,
            PieceType::King => 0.0,
        }
    }

    /// The variant a pawn actually becomes when this one is requested.
    pub fn promotion_target(self) -> PieceType {
        match self {
            PieceType::Knight | PieceType::Bishop | PieceType::Rook => self,
            _ => PieceType::Queen,
        }
    }

    pub fn to_char(self, color: Color) -> char {
        let c = match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        };
        match color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_char(c: char) -> Option<(PieceType, Color)> {
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        let pt = match c.to_ascii_lowercase() {
            'p' => PieceType::Pawn,
            'n' => PieceType::Knight,
            'b' => PieceType::Bishop,
            'r' => PieceType::Rook,
            'q' => PieceType::Queen,
            'k' => PieceType::King,
            _ => return None,
        };
        Some((pt, color))
    }
}

/// Index of a piece in the board's piece set. Stable for the piece's life.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct PieceId(pub usize);

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
    pub position: Coord,
    pub has_moved: bool,
    /// Legal destinations, recomputed after every ply. Empty for the side
    /// not to move.
    pub legal_moves: Vec<Coord>,
}

impl Piece {
    pub fn new(piece_type: PieceType, color: Color, position: Coord) -> Self {
        Piece {
            piece_type,
            color,
            position,
            has_moved: false,
            legal_moves: Vec::new(),
        }
    }

    pub fn is_pawn(&self) -> bool {
        self.piece_type == PieceType::Pawn
    }

    pub fn is_king(&self) -> bool {
        self.piece_type == PieceType::King
    }

    pub fn is_rook(&self) -> bool {
        self.piece_type == PieceType::Rook
    }
}
