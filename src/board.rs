use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::moves::Move;
use crate::piece::{Color, Piece, PieceId, PieceType};
use crate::square::{Coord, Square};

/// Halfmoves without a capture or pawn move after which the game is drawn.
pub const FIFTY_MOVE_LIMIT: u32 = 50;

/// Occurrences of one minimal position that end the game.
pub const REPETITION_LIMIT: usize = 3;

/// Why a finished game ended.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Outcome {
    Checkmate,
    Stalemate,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate => f.write_str("Checkmate"),
            Outcome::Stalemate => f.write_str("Stalemate"),
            Outcome::FiftyMoveRule => f.write_str("50-move rule"),
            Outcome::ThreefoldRepetition => f.write_str("Three-fold repetition"),
        }
    }
}

/// The game state: grid, piece set, counters and termination status.
///
/// Squares refer to pieces by [`PieceId`] and pieces store their square's
/// [`Coord`], so the grid and the piece set always agree on placement.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Board {
    /// Indexed `[y][x]`.
    pub(crate) squares: [[Square; 8]; 8],
    /// Removed pieces leave a `None` so live ids stay valid.
    pub(crate) pieces: Vec<Option<Piece>>,
    /// Even = White to move.
    pub(crate) ply: u32,
    pub(crate) en_passant_target: Option<Coord>,
    pub(crate) en_passant_victim: Option<PieceId>,
    pub(crate) fifty_move_counter: u32,
    pub(crate) position_history: Vec<String>,
    pub(crate) game_over: bool,
    pub(crate) winner: Option<Color>,
    pub(crate) outcome: Option<Outcome>,
    pub(crate) move_history: Vec<Move>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields touched by a simulated move, enough to put them back.
#[derive(Clone, Copy)]
struct Undo {
    mover: PieceId,
    origin: Coord,
    destination: Coord,
    mover_had_moved: bool,
    captured: Option<(PieceId, Coord)>,
}

/// A move applied speculatively to a board. Dropping it restores every
/// touched field, whichever way the caller leaves scope.
struct SimulatedMove<'a> {
    board: &'a mut Board,
    undo: Undo,
}

impl<'a> SimulatedMove<'a> {
    fn apply(board: &'a mut Board, origin: Coord, destination: Coord) -> Option<Self> {
        if origin == destination {
            return None;
        }
        let mover = board.occupant(origin)?;
        let (is_pawn, mover_had_moved) = {
            let piece = board.piece(mover)?;
            (piece.is_pawn(), piece.has_moved)
        };

        let captured = match board.occupant(destination) {
            Some(id) => Some((id, destination)),
            None if is_pawn && board.square(destination).en_passant => board
                .en_passant_victim
                .and_then(|id| board.piece(id).map(|p| (id, p.position))),
            None => None,
        };
        if let Some((_, at)) = captured {
            board.square_mut(at).occupant = None;
        }

        board.square_mut(origin).occupant = None;
        board.square_mut(destination).occupant = Some(mover);
        if let Some(piece) = board.piece_mut(mover) {
            piece.position = destination;
            piece.has_moved = true;
        }
        board.ply += 1;

        Some(SimulatedMove {
            board,
            undo: Undo { mover, origin, destination, mover_had_moved, captured },
        })
    }

    fn leaves_king_attacked(&self) -> bool {
        let Some(color) = self.board.piece(self.undo.mover).map(|p| p.color) else {
            return false;
        };
        let Some(king) = self.board.king_square(color) else {
            return false;
        };
        let excluded = self.undo.captured.map(|(id, _)| id);
        self.board.hostile_squares(color.opposite(), excluded).contains(&king)
    }
}

impl Drop for SimulatedMove<'_> {
    fn drop(&mut self) {
        let undo = self.undo;
        self.board.ply -= 1;
        if let Some(piece) = self.board.piece_mut(undo.mover) {
            piece.position = undo.origin;
            piece.has_moved = undo.mover_had_moved;
        }
        self.board.square_mut(undo.destination).occupant = None;
        self.board.square_mut(undo.origin).occupant = Some(undo.mover);
        if let Some((id, at)) = undo.captured {
            self.board.square_mut(at).occupant = Some(id);
        }
    }
}

impl Board {
    /// A board with no pieces and White to move. Callers place pieces and
    /// then call [`Board::refresh`].
    pub(crate) fn empty() -> Self {
        let mut squares = [[Square::new(Coord { x: 0, y: 0 }); 8]; 8];
        for coord in Coord::all() {
            squares[coord.y][coord.x] = Square::new(coord);
        }
        Board {
            squares,
            pieces: Vec::with_capacity(32),
            ply: 0,
            en_passant_target: None,
            en_passant_victim: None,
            fifty_move_counter: 0,
            position_history: Vec::new(),
            game_over: false,
            winner: None,
            outcome: None,
            move_history: Vec::new(),
        }
    }

    /// The standard starting position.
    pub fn new() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for color in [Color::White, Color::Black] {
            for (x, &pt) in back_rank.iter().enumerate() {
                board.place(pt, color, Coord { x, y: color.back_rank() });
            }
            for x in 0..8 {
                board.place(PieceType::Pawn, color, Coord { x, y: color.pawn_rank() });
            }
        }
        board.refresh();
        board
    }

    pub(crate) fn place(&mut self, piece_type: PieceType, color: Color, at: Coord) -> PieceId {
        let id = PieceId(self.pieces.len());
        self.pieces.push(Some(Piece::new(piece_type, color, at)));
        self.square_mut(at).occupant = Some(id);
        id
    }

    fn remove(&mut self, id: PieceId) {
        if let Some(piece) = self.pieces.get_mut(id.0).and_then(Option::take) {
            let square = self.square_mut(piece.position);
            if square.occupant == Some(id) {
                square.occupant = None;
            }
        }
    }

    /// Move a piece to `to`, keeping grid and piece in agreement.
    fn relocate(&mut self, id: PieceId, to: Coord) {
        let Some(from) = self.piece(id).map(|p| p.position) else {
            return;
        };
        self.square_mut(from).occupant = None;
        self.square_mut(to).occupant = Some(id);
        if let Some(piece) = self.piece_mut(id) {
            piece.position = to;
            piece.has_moved = true;
        }
    }

    // --- queries ---

    pub fn square(&self, coord: Coord) -> &Square {
        &self.squares[coord.y][coord.x]
    }

    pub(crate) fn square_mut(&mut self, coord: Coord) -> &mut Square {
        &mut self.squares[coord.y][coord.x]
    }

    pub fn occupant(&self, coord: Coord) -> Option<PieceId> {
        self.square(coord).occupant
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn piece_at(&self, coord: Coord) -> Option<&Piece> {
        self.occupant(coord).and_then(|id| self.piece(id))
    }

    /// All pieces still on the board.
    pub fn pieces(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.pieces
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (PieceId(i), p)))
    }

    fn piece_ids(&self) -> Vec<PieceId> {
        self.pieces().map(|(id, _)| id).collect()
    }

    pub fn side_to_move(&self) -> Color {
        if self.ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn fifty_move_counter(&self) -> u32 {
        self.fifty_move_counter
    }

    pub fn en_passant_target(&self) -> Option<Coord> {
        self.en_passant_target
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// `None` while the game runs and for drawn games.
    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn move_history(&self) -> &[Move] {
        &self.move_history
    }

    pub fn position_history(&self) -> &[String] {
        &self.position_history
    }

    pub fn king_square(&self, color: Color) -> Option<Coord> {
        self.pieces()
            .find(|(_, p)| p.is_king() && p.color == color)
            .map(|(_, p)| p.position)
    }

    /// Union of the pseudo-legal destinations of every `color` piece except
    /// `exclude`. Ignores self-check and castling.
    pub fn hostile_squares(&self, color: Color, exclude: Option<PieceId>) -> HashSet<Coord> {
        self.pieces()
            .filter(|&(id, p)| p.color == color && Some(id) != exclude)
            .flat_map(|(id, _)| self.pseudo_destinations(id, true))
            .collect()
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(king) => self.hostile_squares(color.opposite(), None).contains(&king),
            None => false,
        }
    }

    /// Legal moves for the side to move, in generation order. Empty once
    /// the game is over.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.game_over {
            return Vec::new();
        }
        let side = self.side_to_move();
        self.pieces()
            .filter(|(_, p)| p.color == side)
            .flat_map(|(_, p)| p.legal_moves.iter().map(move |&d| Move::new(p.position, d)))
            .collect()
    }

    // --- move simulation ---

    /// Whether moving the piece on `origin` to `destination` keeps its own
    /// king out of check. The board is identical before and after the call.
    pub fn try_move(&mut self, origin: Coord, destination: Coord) -> bool {
        match SimulatedMove::apply(self, origin, destination) {
            Some(sim) => !sim.leaves_king_attacked(),
            None => false,
        }
    }

    // --- move execution ---

    /// Play a move if it is legal for the side to move. Returns false and
    /// leaves the board untouched otherwise.
    pub fn submit_move(&mut self, origin: Coord, destination: Coord, promotion: PieceType) -> bool {
        if self.game_over {
            debug!(%origin, %destination, "rejected move: game is over");
            return false;
        }
        let legal = self.piece_at(origin).is_some_and(|p| {
            p.color == self.side_to_move() && p.legal_moves.contains(&destination)
        });
        if !legal {
            debug!(%origin, %destination, "rejected illegal move");
            return false;
        }
        self.execute_move(origin, destination, promotion);
        true
    }

    pub fn submit(&mut self, mv: &Move) -> bool {
        self.submit_move(mv.origin, mv.destination, mv.promotion)
    }

    /// Submit a move in coordinate notation, e.g. "e2e4" or "e7e8n".
    pub fn submit_uci(&mut self, notation: &str) -> bool {
        match Move::from_uci(notation) {
            Some(mv) => self.submit(&mv),
            None => {
                debug!(notation, "rejected malformed move");
                false
            }
        }
    }

    fn execute_move(&mut self, origin: Coord, destination: Coord, promotion: PieceType) {
        let Some(mover) = self.occupant(origin) else {
            return;
        };
        let Some((color, is_pawn, is_king)) =
            self.piece(mover).map(|p| (p.color, p.is_pawn(), p.is_king()))
        else {
            return;
        };

        let captured = self.occupant(destination);
        if captured.is_some() || is_pawn {
            self.fifty_move_counter = 0;
        } else {
            self.fifty_move_counter += 1;
        }
        if let Some(id) = captured {
            self.remove(id);
        }

        let double_step = is_pawn && origin.y.abs_diff(destination.y) == 2;
        let castling = is_king && origin.x.abs_diff(destination.x) == 2;

        if castling {
            let kingside = destination.x > origin.x;
            let rook_from = Coord { x: if kingside { 7 } else { 0 }, y: origin.y };
            let rook_to = Coord { x: if kingside { origin.x + 1 } else { origin.x - 1 }, y: origin.y };
            if let Some(rook) = self.occupant(rook_from) {
                self.relocate(rook, rook_to);
            }
        }

        self.relocate(mover, destination);

        // The en passant window lasts exactly one ply.
        if let Some(target) = self.en_passant_target.take() {
            let victim = self.en_passant_victim.take();
            if is_pawn && destination == target {
                if let Some(victim) = victim {
                    self.remove(victim);
                }
            }
            self.square_mut(target).en_passant = false;
        }

        if double_step {
            let skipped = Coord { x: origin.x, y: (origin.y + destination.y) / 2 };
            self.square_mut(skipped).en_passant = true;
            self.en_passant_target = Some(skipped);
            self.en_passant_victim = Some(mover);
        }

        if is_pawn && destination.y == color.promotion_rank() {
            self.remove(mover);
            let promoted = self.place(promotion.promotion_target(), color, destination);
            if let Some(piece) = self.piece_mut(promoted) {
                piece.has_moved = true;
            }
        }

        self.ply += 1;
        self.move_history.push(Move::new(origin, destination).with_promotion(promotion));
        self.refresh();
    }

    /// Regenerate every piece's legal-move cache, then evaluate termination.
    pub(crate) fn refresh(&mut self) {
        let side = self.side_to_move();
        for id in self.piece_ids() {
            let moves = match self.piece(id) {
                Some(p) if p.color == side => self.legal_destinations(id),
                _ => Vec::new(),
            };
            if let Some(piece) = self.piece_mut(id) {
                piece.legal_moves = moves;
            }
        }
        self.check_game_over();
    }

    fn check_game_over(&mut self) {
        let side = self.side_to_move();

        let stuck = self
            .pieces()
            .filter(|(_, p)| p.color == side)
            .all(|(_, p)| p.legal_moves.is_empty());
        if stuck {
            if self.is_in_check(side) {
                self.finish(Outcome::Checkmate, Some(side.opposite()));
            } else {
                self.finish(Outcome::Stalemate, None);
            }
        }

        if self.fifty_move_counter >= FIFTY_MOVE_LIMIT {
            self.finish(Outcome::FiftyMoveRule, None);
        }

        let key = self.position_key();
        self.position_history.push(key);
        let seen = self
            .position_history
            .iter()
            .filter(|&k| Some(k) == self.position_history.last())
            .count();
        if seen >= REPETITION_LIMIT {
            self.finish(Outcome::ThreefoldRepetition, None);
        }

        // Insufficient material is not detected.
    }

    fn finish(&mut self, outcome: Outcome, winner: Option<Color>) {
        self.game_over = true;
        self.outcome = Some(outcome);
        self.winner = winner;
        // Also reached by every search clone that hits a terminal position.
        debug!(%outcome, ?winner, ply = self.ply, "game over");
    }
}
