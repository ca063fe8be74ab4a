use std::fmt;

use serde::{Deserialize, Serialize};

use crate::piece::PieceType;
use crate::square::Coord;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Move {
    pub origin: Coord,
    pub destination: Coord,
    /// Only consulted when a pawn reaches its last rank.
    pub promotion: PieceType,
    /// Filled in by the search.
    pub score: Option<f64>,
}

impl Move {
    pub fn new(origin: Coord, destination: Coord) -> Self {
        Move { origin, destination, promotion: PieceType::Queen, score: None }
    }

    pub fn with_promotion(mut self, promotion: PieceType) -> Self {
        self.promotion = promotion;
        self
    }

    /// Convert to coordinate notation, e.g. "e2e4", "a7a8n". Queen
    /// promotion is implied and gets no suffix.
    pub fn to_uci(&self) -> String {
        let promo = match self.promotion.promotion_target() {
            PieceType::Rook => "r",
            PieceType::Bishop => "b",
            PieceType::Knight => "n",
            _ => "",
        };
        format!("{}{}{promo}", self.origin, self.destination)
    }

    /// Parse from coordinate notation
    pub fn from_uci(s: &str) -> Option<Move> {
        if !s.is_ascii() || s.len() < 4 || s.len() > 5 {
            return None;
        }
        let origin = Coord::from_algebraic(&s[0..2])?;
        let destination = Coord::from_algebraic(&s[2..4])?;
        let promotion = match s.as_bytes().get(4) {
            None | Some(b'q') => PieceType::Queen,
            Some(b'r') => PieceType::Rook,
            Some(b'b') => PieceType::Bishop,
            Some(b'n') => PieceType::Knight,
            Some(_) => return None,
        };
        Some(Move::new(origin, destination).with_promotion(promotion))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_promotion_moves() {
        let mv = Move::from_uci("e2e4").unwrap();
        assert_eq!(mv.origin, Coord { x: 4, y: 1 });
        assert_eq!(mv.destination, Coord { x: 4, y: 3 });
        assert_eq!(mv.promotion, PieceType::Queen);

        let under = Move::from_uci("a7a8n").unwrap();
        assert_eq!(under.promotion, PieceType::Knight);
        assert_eq!(under.to_uci(), "a7a8n");
    }

    #[test]
    fn rejects_malformed_notation() {
        assert!(Move::from_uci("e2").is_none());
        assert!(Move::from_uci("e2e9").is_none());
        assert!(Move::from_uci("e7e8k").is_none());
        assert!(Move::from_uci("e2e4qq").is_none());
    }
}
