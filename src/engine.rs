// =============================================================================
// Chess AI Engine
//
// Plain minimax with alpha-beta pruning over cloned boards. The side to move
// maximizes when it is the searching side and minimizes otherwise; moves are
// searched in generation order. Only the root is parallel: each candidate is
// scored on its own clone and the collect is the join barrier.
//
// Scores are from `perspective`'s point of view. Finished games score +inf,
// -inf or 0 no matter how much depth is left.
// =============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::Board;
use crate::error::ConfigError;
use crate::moves::Move;
use crate::piece::Color;
use crate::square::Coord;

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Platform-appropriate random number in [0, 1).
/// Uses js_sys::Math::random() in WASM builds, rand crate natively.
fn random_f64() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Math::random()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use rand::Rng;
        rand::thread_rng().gen::<f64>()
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Weights for the positional terms. Material is always counted in whole
/// pawns, so these stay small enough that a piece outweighs any of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    /// Bonus for a piece standing on d4/d5/e4/e5.
    pub centre_occupy: f64,
    /// Bonus per centre square attacked.
    pub centre_attack: f64,
    /// Penalty per c-f file pawn still on its starting square.
    pub undeveloped_pawn: f64,
    /// Scales victim value / attacker value for every attacked enemy piece.
    pub pressure: f64,
    /// Bonus per pseudo-legal destination.
    pub mobility: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            centre_occupy: 0.2,
            centre_attack: 0.15,
            undeveloped_pawn: 0.1,
            pressure: 0.1,
            mobility: 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Uniformly random legal move.
    Random,
    #[default]
    Minimax,
}

/// How the AI picks moves. Every field has a default, so partial JSON such
/// as `{"depth": 2}` is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub policy: Policy,
    /// Plies searched, counting the root move. Values below 1 search 1.
    pub depth: u32,
    pub weights: Weights,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AiConfig {
    pub fn new() -> Self {
        AiConfig {
            policy: Policy::Minimax,
            depth: 3,
            weights: Weights::default(),
        }
    }

    pub fn random() -> Self {
        AiConfig { policy: Policy::Random, ..Self::new() }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// The result of a move search: the chosen move (with its root score for
/// minimax) and how many positions were statically evaluated.
#[derive(Clone, Debug)]
pub struct PickResult {
    pub mv: Move,
    pub evals: u64,
}

/// d4, e4, d5, e5.
const CENTRE: [Coord; 4] = [
    Coord { x: 3, y: 3 },
    Coord { x: 4, y: 3 },
    Coord { x: 3, y: 4 },
    Coord { x: 4, y: 4 },
];

/// Files whose pawns are expected to move early (c through f).
const DEVELOPING_FILES: std::ops::RangeInclusive<usize> = 2..=5;

// =============================================================================
// Evaluation
// =============================================================================

/// Score the board for `perspective`. Terminal positions dominate; otherwise
/// material plus the weighted positional terms, each counted positive for
/// `perspective`'s pieces and negative for the opponent's.
pub fn evaluate(board: &Board, perspective: Color, config: &AiConfig) -> f64 {
    if board.is_game_over() {
        return match board.winner() {
            Some(winner) if winner == perspective => f64::INFINITY,
            Some(_) => f64::NEG_INFINITY,
            None => 0.0,
        };
    }

    let w = &config.weights;
    let mut score = 0.0;

    for (id, piece) in board.pieces() {
        let sign = if piece.color == perspective { 1.0 } else { -1.0 };
        score += sign * piece.piece_type.value();

        if CENTRE.contains(&piece.position) {
            score += sign * w.centre_occupy;
        }
        if piece.is_pawn() && !piece.has_moved && DEVELOPING_FILES.contains(&piece.position.x) {
            score -= sign * w.undeveloped_pawn;
        }

        // Cheap attackers on valuable victims count most.
        let attacker = piece.piece_type.value().max(1.0);
        for target in board.pseudo_destinations(id, true) {
            if let Some(victim) = board.piece_at(target).filter(|v| v.color != piece.color) {
                score += sign * w.pressure * victim.piece_type.value() / attacker;
            }
        }

        score += sign * w.mobility * board.pseudo_destinations(id, false).len() as f64;
    }

    let ours = board.hostile_squares(perspective, None);
    let theirs = board.hostile_squares(perspective.opposite(), None);
    for square in &CENTRE {
        if ours.contains(square) {
            score += w.centre_attack;
        }
        if theirs.contains(square) {
            score -= w.centre_attack;
        }
    }

    score
}

// =============================================================================
// Search: minimax with alpha-beta pruning
// =============================================================================

/// Minimax value of `board` for `perspective`, looking `depth` plies ahead.
///
/// The side to move maximizes if it is `perspective` and minimizes
/// otherwise. After each child the matching bound is tightened first and the
/// cutoff tested second. `evals` counts static evaluations.
pub fn search(
    board: &Board,
    depth: u32,
    mut alpha: f64,
    mut beta: f64,
    perspective: Color,
    config: &AiConfig,
    evals: &mut u64,
) -> f64 {
    if depth == 0 || board.is_game_over() {
        *evals += 1;
        return evaluate(board, perspective, config);
    }

    let maximizing = board.side_to_move() == perspective;
    let mut value = if maximizing { f64::NEG_INFINITY } else { f64::INFINITY };

    for mv in board.legal_moves() {
        let mut child = board.clone();
        if !child.submit(&mv) {
            continue;
        }
        let score = search(&child, depth - 1, alpha, beta, perspective, config, evals);
        if maximizing {
            value = value.max(score);
            alpha = alpha.max(value);
        } else {
            value = value.min(score);
            beta = beta.min(value);
        }
        if alpha >= beta {
            break;
        }
    }

    value
}

// =============================================================================
// Move selection
// =============================================================================

/// Score one root candidate on its own clone.
fn score_root(board: &Board, mut mv: Move, depth: u32, config: &AiConfig) -> (Move, u64) {
    let perspective = board.side_to_move();
    let mut evals = 0;
    let mut child = board.clone();
    let score = if child.submit(&mv) {
        search(&child, depth - 1, f64::NEG_INFINITY, f64::INFINITY, perspective, config, &mut evals)
    } else {
        f64::NEG_INFINITY
    };
    debug!(mv = %mv, score, evals, "root move scored");
    mv.score = Some(score);
    (mv, evals)
}

/// Highest-scoring legal move for the side to move, searching
/// `config.depth` plies. Ties keep the first move in generation order.
/// Returns `None` when there is nothing to play.
pub fn best_move(board: &Board, config: &AiConfig) -> Option<PickResult> {
    let moves = board.legal_moves();
    if moves.is_empty() {
        return None;
    }
    let depth = config.depth.max(1);

    #[cfg(not(target_arch = "wasm32"))]
    let scored: Vec<(Move, u64)> = moves
        .into_par_iter()
        .map(|mv| score_root(board, mv, depth, config))
        .collect();
    #[cfg(target_arch = "wasm32")]
    let scored: Vec<(Move, u64)> = moves
        .into_iter()
        .map(|mv| score_root(board, mv, depth, config))
        .collect();

    let evals: u64 = scored.iter().map(|(_, n)| n).sum();
    let mut best: Option<Move> = None;
    for (mv, _) in scored {
        let better = match &best {
            None => true,
            Some(current) => mv.score.unwrap_or(f64::NEG_INFINITY) > current.score.unwrap_or(f64::NEG_INFINITY),
        };
        if better {
            best = Some(mv);
        }
    }
    best.map(|mv| PickResult { mv, evals })
}

/// A uniformly random legal move for the side to move.
pub fn random_move(board: &Board) -> Option<Move> {
    let moves = board.legal_moves();
    if moves.is_empty() {
        return None;
    }
    let index = ((random_f64() * moves.len() as f64) as usize).min(moves.len() - 1);
    moves.into_iter().nth(index)
}

/// Pick a move for the side to move using the configured policy.
pub fn pick_move(board: &Board, config: &AiConfig) -> Option<PickResult> {
    let result = match config.policy {
        Policy::Random => random_move(board).map(|mv| PickResult { mv, evals: 0 }),
        Policy::Minimax => best_move(board, config),
    }?;
    info!(
        side = %board.side_to_move(),
        mv = %result.mv,
        score = ?result.mv.score,
        evals = result.evals,
        "picked move"
    );
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceType;

    fn board(fen: &str) -> Board {
        Board::from_fen(fen).unwrap()
    }

    fn config(depth: u32) -> AiConfig {
        AiConfig { depth, ..AiConfig::new() }
    }

    #[test]
    fn finished_games_score_the_same_at_any_depth() {
        let mated = board("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1");
        assert!(mated.is_game_over());
        for depth in 0..4 {
            let mut evals = 0;
            let white = search(&mated, depth, f64::NEG_INFINITY, f64::INFINITY, Color::White, &config(3), &mut evals);
            let black = search(&mated, depth, f64::NEG_INFINITY, f64::INFINITY, Color::Black, &config(3), &mut evals);
            assert_eq!(white, f64::INFINITY);
            assert_eq!(black, f64::NEG_INFINITY);
        }
    }

    #[test]
    fn drawn_games_score_zero() {
        let stalemate = board("k7/8/1Q6/8/8/8/8/4K3 b - - 0 1");
        assert!(stalemate.is_game_over());
        assert_eq!(evaluate(&stalemate, Color::White, &config(1)), 0.0);
        assert_eq!(evaluate(&stalemate, Color::Black, &config(1)), 0.0);
    }

    #[test]
    fn finds_mate_in_one() {
        for depth in 1..=2 {
            let board = board("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
            let result = best_move(&board, &config(depth)).expect("white has moves");
            assert_eq!(result.mv.to_uci(), "a1a8", "depth {depth}");
            assert_eq!(result.mv.score, Some(f64::INFINITY));
            assert!(result.evals > 0);
        }
    }

    #[test]
    fn takes_a_hanging_queen() {
        let board = board("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1");
        let result = best_move(&board, &config(2)).unwrap();
        assert_eq!(result.mv.to_uci(), "d2d5");
    }

    #[test]
    fn start_position_is_balanced() {
        let start = Board::new();
        assert!(evaluate(&start, Color::White, &config(1)).abs() < 1e-9);
    }

    #[test]
    fn material_counts_for_the_owner() {
        let board = board("4k3/8/8/8/8/8/8/Q3K3 w - - 0 1");
        let white = evaluate(&board, Color::White, &config(1));
        let black = evaluate(&board, Color::Black, &config(1));
        assert!(white > 8.0, "extra queen should dominate: {white}");
        assert!((white + black).abs() < 1e-9, "perspectives must mirror");
    }

    #[test]
    fn random_policy_plays_legal_moves() {
        let mut board = Board::new();
        for _ in 0..40 {
            if board.is_game_over() {
                break;
            }
            let legal = board.legal_moves();
            let mv = random_move(&board).unwrap();
            assert!(legal.contains(&mv), "{mv}");
            assert!(board.submit(&mv));
        }
    }

    #[test]
    fn pick_move_dispatches_on_policy() {
        let board = Board::new();
        let random = pick_move(&board, &AiConfig::random()).unwrap();
        assert_eq!(random.evals, 0);
        assert!(random.mv.score.is_none());
        assert!(board.legal_moves().contains(&random.mv));

        let searched = pick_move(&board, &config(1)).unwrap();
        assert!(searched.mv.score.is_some());
        assert_eq!(searched.evals, 20);
    }

    #[test]
    fn nothing_to_pick_once_the_game_is_over() {
        let mated = board("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1");
        assert!(pick_move(&mated, &AiConfig::new()).is_none());
        assert!(random_move(&mated).is_none());
    }

    #[test]
    fn searched_moves_promote_to_queen() {
        let board = board("7k/P7/8/8/8/8/8/K7 w - - 0 1");
        let result = best_move(&board, &config(1)).unwrap();
        assert_eq!(result.mv.to_uci(), "a7a8");
        assert_eq!(result.mv.promotion, PieceType::Queen);
    }

    #[test]
    fn config_reads_partial_json() {
        let config = AiConfig::from_json(r#"{"depth": 1}"#).unwrap();
        assert_eq!(config.depth, 1);
        assert_eq!(config.policy, Policy::Minimax);
        assert_eq!(config.weights, Weights::default());

        let config = AiConfig::from_json(r#"{"policy": "random", "weights": {"mobility": 0.0}}"#).unwrap();
        assert_eq!(config.policy, Policy::Random);
        assert_eq!(config.weights.mobility, 0.0);
        assert_eq!(config.weights.pressure, Weights::default().pressure);
    }

    #[test]
    fn config_errors_are_typed() {
        assert!(matches!(AiConfig::from_json("{"), Err(ConfigError::Json(_))));
        assert!(matches!(AiConfig::from_json(r#"{"policy": "greedy"}"#), Err(ConfigError::Json(_))));
        assert!(matches!(AiConfig::load("/nonexistent/ai.json"), Err(ConfigError::Io(_))));
    }
}
