//! Move generation for each piece variant.
//!
//! Pseudo-legal generation follows occupancy rules only. Legal generation
//! filters every candidate through [`Board::try_move`] and, for kings, adds
//! castling.

use crate::board::Board;
use crate::piece::{Color, PieceId, PieceType};
use crate::square::Coord;

impl Board {
    /// Destinations reachable by piece `id` ignoring self-check and castling.
    ///
    /// With `attacks_only` set, pawns contribute only their diagonal
    /// captures; this is the mode used for attack sets.
    pub(crate) fn pseudo_destinations(&self, id: PieceId, attacks_only: bool) -> Vec<Coord> {
        let Some(piece) = self.piece(id) else {
            return Vec::new();
        };
        match piece.piece_type {
            PieceType::Pawn => self.pawn_destinations(piece.position, piece.color, piece.has_moved, attacks_only),
            pt => self.vector_destinations(piece.position, piece.color, pt),
        }
    }

    /// Walk each movement vector: once for knights and kings, until blocked
    /// for sliders. Friendly pieces stop the walk, enemy pieces are included
    /// and then stop it.
    fn vector_destinations(&self, from: Coord, color: Color, pt: PieceType) -> Vec<Coord> {
        let mut out = Vec::new();
        for &(dx, dy) in pt.vectors() {
            let mut current = from;
            while let Some(next) = current.offset(dx, dy) {
                match self.piece_at(next) {
                    Some(other) if other.color == color => break,
                    Some(_) => {
                        out.push(next);
                        break;
                    }
                    None => out.push(next),
                }
                if !pt.slides() {
                    break;
                }
                current = next;
            }
        }
        out
    }

    fn pawn_destinations(&self, from: Coord, color: Color, has_moved: bool, attacks_only: bool) -> Vec<Coord> {
        let mut out = Vec::new();
        let forward = color.forward();

        if !attacks_only {
            if let Some(one) = from.offset(0, forward).filter(|&c| self.square(c).is_empty()) {
                out.push(one);
                if !has_moved {
                    if let Some(two) = one.offset(0, forward).filter(|&c| self.square(c).is_empty()) {
                        out.push(two);
                    }
                }
            }
        }

        for dx in [1, -1] {
            let Some(target) = from.offset(dx, forward) else {
                continue;
            };
            match self.piece_at(target) {
                Some(other) if other.color != color => out.push(target),
                None if self.square(target).en_passant && self.en_passant_victim_color() != Some(color) => {
                    out.push(target)
                }
                _ => {}
            }
        }
        out
    }

    fn en_passant_victim_color(&self) -> Option<Color> {
        self.en_passant_victim.and_then(|id| self.piece(id)).map(|p| p.color)
    }

    /// Legal destinations for piece `id`, in generation order.
    pub(crate) fn legal_destinations(&mut self, id: PieceId) -> Vec<Coord> {
        let Some((origin, is_king)) = self.piece(id).map(|p| (p.position, p.is_king())) else {
            return Vec::new();
        };
        let mut legal: Vec<Coord> = self
            .pseudo_destinations(id, false)
            .into_iter()
            .filter(|&destination| self.try_move(origin, destination))
            .collect();
        if is_king {
            legal.extend(self.castling_destinations(id));
        }
        legal
    }

    /// Kingside then queenside castling targets for an unmoved king on its
    /// home square. The king may not start in, pass through, or land on an
    /// attacked square.
    fn castling_destinations(&mut self, id: PieceId) -> Vec<Coord> {
        let Some(king) = self.piece(id) else {
            return Vec::new();
        };
        let (color, origin) = (king.color, king.position);
        let home = Coord { x: 4, y: color.back_rank() };
        if king.has_moved || origin != home || self.is_in_check(color) {
            return Vec::new();
        }

        let mut out = Vec::new();
        for (rook_x, dir) in [(7usize, 1i32), (0, -1)] {
            let rook_square = Coord { x: rook_x, y: origin.y };
            let rook_ready = self
                .piece_at(rook_square)
                .is_some_and(|r| r.is_rook() && r.color == color && !r.has_moved);
            if !rook_ready {
                continue;
            }

            let (low, high) = if rook_x > origin.x { (origin.x + 1, rook_x) } else { (rook_x + 1, origin.x) };
            if (low..high).any(|x| !self.square(Coord { x, y: origin.y }).is_empty()) {
                continue;
            }

            let path: Vec<Coord> = (1..=2).filter_map(|step| origin.offset(dir * step, 0)).collect();
            if path.iter().all(|&step| self.try_move(origin, step)) {
                if let Some(&landing) = path.last() {
                    out.push(landing);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Coord {
        Coord::from_algebraic(s).unwrap()
    }

    fn pseudo(board: &Board, from: &str, attacks_only: bool) -> Vec<String> {
        let id = board.occupant(sq(from)).unwrap();
        let mut out: Vec<String> = board
            .pseudo_destinations(id, attacks_only)
            .iter()
            .map(|c| c.to_algebraic())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn sliders_stop_at_the_first_piece() {
        let board = Board::from_fen("4k3/8/8/3p4/8/1P1R2p1/8/4K3 w - - 0 1").unwrap();
        // d5 is an enemy (included), b3 friendly (excluded), g3 enemy (included).
        assert_eq!(
            pseudo(&board, "d3", false),
            vec!["c3", "d1", "d2", "d4", "d5", "e3", "f3", "g3"]
        );
    }

    #[test]
    fn knights_jump_over_pieces() {
        let board = Board::new();
        assert_eq!(pseudo(&board, "g1", false), vec!["f3", "h3"]);
    }

    #[test]
    fn queen_combines_rook_and_bishop_lines() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1").unwrap();
        let moves = pseudo(&board, "a1", false);
        assert_eq!(moves.len(), 7 + 7 + 3);
        assert!(moves.contains(&"h8".to_string()));
        assert!(moves.contains(&"a8".to_string()));
        assert!(!moves.contains(&"e1".to_string()));
    }

    #[test]
    fn pawn_attack_mode_only_lists_captures() {
        let board = Board::from_fen("4k3/8/8/8/8/3n4/4P3/4K3 w - - 0 1").unwrap();
        assert_eq!(pseudo(&board, "e2", false), vec!["d3", "e3", "e4"]);
        assert_eq!(pseudo(&board, "e2", true), vec!["d3"]);
    }

    #[test]
    fn king_attack_set_excludes_castling() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let attacks = pseudo(&board, "e1", true);
        assert!(!attacks.contains(&"g1".to_string()));
        assert!(!attacks.contains(&"c1".to_string()));
        let legal = &board.piece_at(sq("e1")).unwrap().legal_moves;
        assert!(legal.contains(&sq("g1")));
        assert!(legal.contains(&sq("c1")));
    }

    #[test]
    fn queenside_castling_ignores_attacks_on_the_rook_path() {
        // b1 is attacked but the king never crosses it.
        let board = Board::from_fen("1r2k3/8/8/8/8/8/8/R3K3 w Q - 0 1").unwrap();
        assert!(board.piece_at(sq("e1")).unwrap().legal_moves.contains(&sq("c1")));
    }

    #[test]
    fn pinned_piece_has_no_moves() {
        let board = Board::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        assert!(board.piece_at(sq("e2")).unwrap().legal_moves.is_empty());
        assert!(!pseudo(&board, "e2", false).is_empty());
    }
}
