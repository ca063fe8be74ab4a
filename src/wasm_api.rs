use crate::board::Board;
use crate::engine::{pick_move, AiConfig, Policy};
use crate::moves::Move;
use crate::piece::{Color, PieceType};
use crate::square::Coord;
use serde::Serialize;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct SquarePiece {
    piece_type: PieceType,
    color: Color,
    has_moved: bool,
}

#[derive(Serialize)]
struct MoveJson {
    from: String,
    to: String,
    uci: String,
    score: Option<f64>,
}

#[derive(Serialize)]
struct BoardState {
    /// Indexed `[y][x]`, rank 1 first.
    squares: Vec<Vec<Option<SquarePiece>>>,
    side_to_move: Color,
    fen: String,
    game_over: bool,
    outcome: Option<String>,
    winner: Option<Color>,
    is_in_check: bool,
    legal_moves: Vec<MoveJson>,
    last_move: Option<MoveJson>,
}

#[derive(Serialize)]
struct MoveResult {
    #[serde(flatten)]
    board_state: Option<BoardState>,
    error: Option<String>,
}

fn move_json(mv: &Move) -> MoveJson {
    MoveJson {
        from: mv.origin.to_algebraic(),
        to: mv.destination.to_algebraic(),
        uci: mv.to_uci(),
        score: mv.score,
    }
}

fn build_board_state(board: &Board) -> BoardState {
    let squares = (0..8)
        .map(|y| {
            (0..8)
                .map(|x| {
                    board.piece_at(Coord { x, y }).map(|p| SquarePiece {
                        piece_type: p.piece_type,
                        color: p.color,
                        has_moved: p.has_moved,
                    })
                })
                .collect()
        })
        .collect();

    BoardState {
        squares,
        side_to_move: board.side_to_move(),
        fen: board.to_fen(),
        game_over: board.is_game_over(),
        outcome: board.outcome().map(|o| o.to_string()),
        winner: board.winner(),
        is_in_check: board.is_in_check(board.side_to_move()),
        legal_moves: board.legal_moves().iter().map(move_json).collect(),
        last_move: board.move_history().last().map(move_json),
    }
}

fn log_if_finished(board: &Board) {
    if let Some(outcome) = board.outcome() {
        info!(%outcome, winner = ?board.winner(), ply = board.ply(), "game over");
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn error(message: String) -> JsValue {
    to_js(&MoveResult { board_state: None, error: Some(message) })
}

#[wasm_bindgen]
pub struct Game {
    board: Board,
    ai_config: AiConfig,
    last_evals: u64,
}

#[wasm_bindgen]
impl Game {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Game {
        Game {
            board: Board::new(),
            ai_config: AiConfig::new(),
            last_evals: 0,
        }
    }

    /// Replace the game with a position string. Returns the new state, or an
    /// error object if the string does not parse.
    pub fn load_fen(&mut self, fen: &str) -> JsValue {
        match Board::from_fen(fen) {
            Ok(board) => {
                self.board = board;
                to_js(&build_board_state(&self.board))
            }
            Err(e) => error(e.to_string()),
        }
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.ai_config.depth = depth.clamp(1, 5);
    }

    pub fn set_random(&mut self, random: bool) {
        self.ai_config.policy = if random { Policy::Random } else { Policy::Minimax };
    }

    /// Replace the AI config with JSON; missing fields keep their defaults.
    pub fn set_config(&mut self, json: &str) -> Result<(), JsValue> {
        self.ai_config = AiConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(())
    }

    pub fn get_board_state(&self) -> JsValue {
        to_js(&build_board_state(&self.board))
    }

    /// Play a move in coordinate notation, e.g. "e2e4" or "e7e8n".
    pub fn make_move(&mut self, uci: &str) -> JsValue {
        if self.board.is_game_over() {
            return error("Game is already over".to_string());
        }
        if self.board.submit_uci(uci) {
            log_if_finished(&self.board);
            to_js(&build_board_state(&self.board))
        } else {
            error("Illegal move".to_string())
        }
    }

    pub fn make_ai_move(&mut self) -> JsValue {
        if let Some(result) = pick_move(&self.board, &self.ai_config) {
            self.last_evals = result.evals;
            if !self.board.submit(&result.mv) {
                warn!(mv = %result.mv, "engine move rejected");
                return error(format!("Engine move {} was rejected", result.mv));
            }
            log_if_finished(&self.board);
        }
        to_js(&build_board_state(&self.board))
    }

    pub fn get_hint(&self) -> JsValue {
        match pick_move(&self.board, &self.ai_config) {
            Some(result) => to_js(&move_json(&result.mv)),
            None => JsValue::NULL,
        }
    }

    pub fn get_legal_moves_for_square(&self, square: &str) -> JsValue {
        let Some(origin) = Coord::from_algebraic(square) else {
            return JsValue::NULL;
        };
        let moves: Vec<MoveJson> = self
            .board
            .legal_moves()
            .iter()
            .filter(|m| m.origin == origin)
            .map(move_json)
            .collect();
        to_js(&moves)
    }

    pub fn get_last_evals(&self) -> u64 {
        self.last_evals
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
