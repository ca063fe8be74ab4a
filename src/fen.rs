//! Position strings (FEN): parsing into a fully initialised [`Board`] and
//! writing one back out.
//!
//! Castling rights are not stored on the board. They are derived from the
//! `has_moved` flags of kings and corner rooks, which the parser seeds from
//! the castling field.

use std::fmt;
use std::str::FromStr;

use crate::board::Board;
use crate::error::PositionError;
use crate::piece::{Color, PieceType};
use crate::square::Coord;

pub const DEFAULT_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Castling flags in FEN order, with the rook's corner file.
const CASTLING: [(char, Color, usize); 4] = [
    ('K', Color::White, 7),
    ('Q', Color::White, 0),
    ('k', Color::Black, 7),
    ('q', Color::Black, 0),
];

impl Board {
    pub fn from_fen(fen: &str) -> Result<Board, PositionError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(PositionError::FieldCount(fields.len()));
        }

        let mut board = Board::empty();
        parse_placement(&mut board, fields[0])?;

        for color in [Color::White, Color::Black] {
            let count = board.pieces().filter(|(_, p)| p.is_king() && p.color == color).count();
            if count != 1 {
                return Err(PositionError::KingCount { color, count });
            }
        }

        let side = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(PositionError::SideToMove(other.to_string())),
        };

        let rights = parse_castling(fields[2])?;
        seed_has_moved(&mut board, &rights);

        if fields[3] != "-" {
            let target = Coord::from_algebraic(fields[3])
                .ok_or_else(|| PositionError::EnPassant(fields[3].to_string()))?;
            // A pawn that double-stepped to rank 4 leaves rank 3 flagged, and
            // only the opponent may capture it on the next ply.
            let (victim_y, victim_color) = match (target.y, side) {
                (2, Color::Black) => (3, Color::White),
                (5, Color::White) => (4, Color::Black),
                _ => return Err(PositionError::EnPassant(fields[3].to_string())),
            };
            let victim = board
                .occupant(Coord { x: target.x, y: victim_y })
                .filter(|&id| {
                    board
                        .piece(id)
                        .is_some_and(|p| p.is_pawn() && p.color == victim_color)
                })
                .ok_or_else(|| PositionError::EnPassant(fields[3].to_string()))?;
            board.square_mut(target).en_passant = true;
            board.en_passant_target = Some(target);
            board.en_passant_victim = Some(victim);
        }

        board.fifty_move_counter = parse_counter(fields.get(4).copied(), "halfmove", 0)?;
        let fullmove = parse_counter(fields.get(5).copied(), "fullmove", 1)?;
        board.ply = fullmove
            .checked_sub(1)
            .and_then(|n| n.checked_mul(2))
            .and_then(|n| n.checked_add(if side == Color::Black { 1 } else { 0 }))
            .ok_or_else(|| PositionError::Counter { field: "fullmove", value: fullmove.to_string() })?;

        board.refresh();
        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {}",
            self.position_key(),
            self.fifty_move_counter,
            self.ply / 2 + 1
        )
    }

    /// The position without its move counters: placement, side to move,
    /// castling rights and en passant target. Used for repetition checks.
    pub fn position_key(&self) -> String {
        let side = match self.side_to_move() {
            Color::White => "w",
            Color::Black => "b",
        };
        let en_passant = self
            .en_passant_target
            .map(Coord::to_algebraic)
            .unwrap_or_else(|| "-".to_string());
        format!("{} {side} {} {en_passant}", self.placement(), self.castling_rights())
    }

    fn placement(&self) -> String {
        let mut out = String::with_capacity(72);
        for y in (0..8).rev() {
            let mut empty = 0;
            for x in 0..8 {
                match self.piece_at(Coord { x, y }) {
                    Some(p) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(p.piece_type.to_char(p.color));
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if y > 0 {
                out.push('/');
            }
        }
        out
    }

    /// A right exists while the king and that corner's rook are both in
    /// place and unmoved.
    fn castling_rights(&self) -> String {
        let unmoved = |coord: Coord, pt: PieceType, color: Color| {
            self.piece_at(coord)
                .is_some_and(|p| p.piece_type == pt && p.color == color && !p.has_moved)
        };
        let rights: String = CASTLING
            .iter()
            .filter(|&&(_, color, rook_x)| {
                let y = color.back_rank();
                unmoved(Coord { x: 4, y }, PieceType::King, color)
                    && unmoved(Coord { x: rook_x, y }, PieceType::Rook, color)
            })
            .map(|&(flag, _, _)| flag)
            .collect();
        if rights.is_empty() {
            "-".to_string()
        } else {
            rights
        }
    }
}

fn parse_placement(board: &mut Board, placement: &str) -> Result<(), PositionError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(PositionError::RankCount(ranks.len()));
    }
    for (i, rank) in ranks.iter().enumerate() {
        let y = 7 - i;
        let width_error = PositionError::RankWidth { rank: y + 1 };
        let mut x = 0;
        for c in rank.chars() {
            if let Some(skip) = c.to_digit(10) {
                if skip == 0 || skip > 8 {
                    return Err(width_error);
                }
                x += skip as usize;
            } else {
                let (pt, color) = PieceType::from_char(c).ok_or(PositionError::UnknownPiece(c))?;
                let at = Coord::new(x, y).ok_or_else(|| width_error.clone())?;
                board.place(pt, color, at);
                x += 1;
            }
            if x > 8 {
                return Err(width_error);
            }
        }
        if x != 8 {
            return Err(width_error);
        }
    }
    Ok(())
}

fn parse_castling(field: &str) -> Result<Vec<char>, PositionError> {
    if field == "-" {
        return Ok(Vec::new());
    }
    let mut rights = Vec::new();
    for c in field.chars() {
        if !CASTLING.iter().any(|&(flag, _, _)| flag == c) || rights.contains(&c) {
            return Err(PositionError::Castling(field.to_string()));
        }
        rights.push(c);
    }
    Ok(rights)
}

/// Pawns off their start rank have moved. Kings and corner rooks have moved
/// unless a castling right names them. Every other piece starts unmoved.
fn seed_has_moved(board: &mut Board, rights: &[char]) {
    let ids: Vec<_> = board.pieces().map(|(id, _)| id).collect();
    for id in ids {
        let Some(piece) = board.piece_mut(id) else {
            continue;
        };
        let color = piece.color;
        let named = |rook_x: Option<usize>| {
            CASTLING.iter().any(|&(flag, c, x)| {
                c == color && rights.contains(&flag) && rook_x.map_or(true, |rx| rx == x)
            })
        };
        piece.has_moved = match piece.piece_type {
            PieceType::Pawn => piece.position.y != color.pawn_rank(),
            PieceType::King => !named(None),
            PieceType::Rook if piece.position.y == color.back_rank() => !named(Some(piece.position.x)),
            PieceType::Rook => true,
            _ => false,
        };
    }
}

fn parse_counter(field: Option<&str>, name: &'static str, default: u32) -> Result<u32, PositionError> {
    match field {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| PositionError::Counter { field: name, value: s.to_string() }),
    }
}

impl FromStr for Board {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_fen(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUND_TRIPS: [&str; 8] = [
        DEFAULT_FEN,
        "r3k2r/pppqbppp/2np1n1B/4p3/4P3/2NP1N1b/PPPQBPPP/R3K2R w Kq - 11 10",
        "r3k2r/ppp2ppp/B1nq1n1B/3pp3/3PP3/b1NQ1N1b/PPP2PPP/R3K2R w Qk - 14 10",
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w - - 4 4",
        "r3k2r/pppb1ppp/2nq1n2/2bpp3/3PPB2/2NQ1N2/PPP1BPPP/R3K2R w - - 20 14",
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "rnbqkbnr/ppp1p1pp/5P2/8/2Pp4/8/PP1P1PPP/RNBQKBNR b KQkq c3 0 4",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    ];

    #[test]
    fn default_board_exports_the_start_position() {
        assert_eq!(Board::new().to_fen(), DEFAULT_FEN);
        assert_eq!(Board::default().to_string(), DEFAULT_FEN);
        assert_eq!(Board::from_fen(DEFAULT_FEN).unwrap().to_fen(), DEFAULT_FEN);
    }

    #[test]
    fn exported_positions_read_back_identically() {
        for fen in ROUND_TRIPS {
            let board: Board = fen.parse().unwrap();
            assert_eq!(board.to_fen(), fen);
            let again = Board::from_fen(&board.to_fen()).unwrap();
            assert_eq!(again.to_fen(), fen);
        }
    }

    #[test]
    fn round_trip_holds_along_a_game() {
        let mut board = Board::new();
        for mv in ["e2e4", "c7c5", "g1f3", "d7d6", "f1b5", "c8d7", "e1g1", "d7b5", "e4e5", "f7f5"] {
            assert!(board.submit_uci(mv), "{mv}");
            let copy = Board::from_fen(&board.to_fen()).unwrap();
            assert_eq!(copy.to_fen(), board.to_fen());
        }
        assert_eq!(board.to_fen(), "rn1qkbnr/pp2p1pp/3p4/1bp1Pp2/8/5N2/PPPP1PPP/RNBQ1RK1 w kq f6 0 6");
    }

    #[test]
    fn seeds_move_flags_from_castling_rights() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        let moved = |s: &str| board.piece_at(Coord::from_algebraic(s).unwrap()).unwrap().has_moved;
        assert!(!moved("e1"));
        assert!(!moved("h1"));
        assert!(moved("a1"));
        assert!(!moved("e8"));
        assert!(!moved("a8"));
        assert!(moved("h8"));
    }

    #[test]
    fn no_rights_means_kings_have_moved() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1").unwrap();
        let king = board.piece_at(Coord::from_algebraic("e1").unwrap()).unwrap();
        assert!(king.has_moved);
        assert!(!king.legal_moves.contains(&Coord::from_algebraic("g1").unwrap()));
    }

    #[test]
    fn en_passant_field_flags_square_and_victim() {
        let board = Board::from_fen(ROUND_TRIPS[5]).unwrap();
        let f6 = Coord::from_algebraic("f6").unwrap();
        assert_eq!(board.en_passant_target(), Some(f6));
        assert!(board.square(f6).en_passant);
        let e5 = board.piece_at(Coord::from_algebraic("e5").unwrap()).unwrap();
        assert!(e5.legal_moves.contains(&f6));
    }

    #[test]
    fn counters_map_to_ply() {
        let board = Board::from_fen(ROUND_TRIPS[6]).unwrap();
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.ply(), 7);
        assert_eq!(board.fifty_move_counter(), 0);

        let short = Board::from_fen("4k3/8/8/8/8/8/8/4K3 b - -").unwrap();
        assert_eq!(short.to_fen(), "4k3/8/8/8/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn position_key_drops_the_counters() {
        let board = Board::from_fen(ROUND_TRIPS[1]).unwrap();
        assert_eq!(
            board.position_key(),
            "r3k2r/pppqbppp/2np1n1B/4p3/4P3/2NP1N1b/PPPQBPPP/R3K2R w Kq -"
        );
        assert_eq!(board.position_history(), [board.position_key()]);
    }

    #[test]
    fn rejects_malformed_positions() {
        let cases: [(&str, PositionError); 13] = [
            ("8/8/8 w", PositionError::FieldCount(2)),
            ("8/8/8/8/8/8/8 w - - 0 1", PositionError::RankCount(7)),
            ("4k3/8/8/8/8/8/8/4K2 w - - 0 1", PositionError::RankWidth { rank: 1 }),
            ("4k3/8/8/8/8/8/8/4K4 w - - 0 1", PositionError::RankWidth { rank: 1 }),
            ("4k3/8/8/8/8/8/8/4X3 w - - 0 1", PositionError::UnknownPiece('X')),
            ("4k3/8/8/8/8/8/8/8 w - - 0 1", PositionError::KingCount { color: Color::White, count: 0 }),
            ("4k3/8/8/8/8/8/8/4K3 x - - 0 1", PositionError::SideToMove("x".to_string())),
            ("4k3/8/8/8/8/8/8/4K3 w KK - 0 1", PositionError::Castling("KK".to_string())),
            ("4k3/8/8/8/8/8/8/4K3 w - e4 0 1", PositionError::EnPassant("e4".to_string())),
            (
                "4k3/8/8/8/8/8/8/4K3 w - - x 1",
                PositionError::Counter { field: "halfmove", value: "x".to_string() },
            ),
            (
                "4k3/8/8/8/8/8/8/4K3 w - - 0 0",
                PositionError::Counter { field: "fullmove", value: "0".to_string() },
            ),
            (
                "4k3/8/8/8/8/8/8/4K3 w - - 0 3000000000",
                PositionError::Counter { field: "fullmove", value: "3000000000".to_string() },
            ),
            // White cannot capture its own pawn that just double-stepped.
            ("4k3/8/8/8/4P3/8/4P3/4K3 w - e3 0 1", PositionError::EnPassant("e3".to_string())),
        ];
        for (fen, expected) in cases {
            assert_eq!(Board::from_fen(fen).unwrap_err(), expected, "{fen}");
        }
    }

    #[test]
    fn en_passant_target_must_face_the_side_to_move() {
        let err = Board::from_fen("4k3/8/8/3p4/8/8/8/4K3 b - d6 0 1").unwrap_err();
        assert_eq!(err, PositionError::EnPassant("d6".to_string()));

        // With the side corrected the same pawn push stays a quiet move.
        let mut board = Board::from_fen("4k3/8/8/8/4P3/8/4P3/4K3 w - - 0 1").unwrap();
        assert!(board.submit_uci("e2e3"));
        assert_eq!(board.pieces().count(), 4);
    }

    #[test]
    fn large_fullmove_numbers_that_fit_round_trip() {
        let fen = "4k3/8/8/8/8/8/8/4K3 b - - 0 1000000";
        assert_eq!(Board::from_fen(fen).unwrap().to_fen(), fen);
    }

    #[test]
    fn en_passant_target_needs_a_pawn_behind_it() {
        let err = Board::from_fen("4k3/8/8/8/8/8/8/4K3 b - e3 0 1").unwrap_err();
        assert_eq!(err, PositionError::EnPassant("e3".to_string()));
    }
}
