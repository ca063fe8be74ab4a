//! Plays one AI-vs-AI game from the start position and logs every move.
//!
//! Usage: selfplay [config.json]

use chess_ai::engine::{pick_move, AiConfig};
use chess_ai::Board;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MAX_PLIES: u32 = 300;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match AiConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(%path, "{e}");
                std::process::exit(1);
            }
        },
        None => AiConfig { depth: 2, ..AiConfig::new() },
    };

    let mut board = Board::new();
    while !board.is_game_over() && board.ply() < MAX_PLIES {
        match pick_move(&board, &config) {
            Some(result) => {
                if !board.submit(&result.mv) {
                    error!(mv = %result.mv, fen = %board, "engine move rejected");
                    break;
                }
            }
            None => break,
        }
    }

    let outcome = board.outcome().map(|o| o.to_string()).unwrap_or_else(|| "ply limit".to_string());
    let winner = board.winner().map(|c| c.to_string()).unwrap_or_else(|| "none".to_string());
    let moves: Vec<String> = board.move_history().iter().map(|m| m.to_uci()).collect();
    info!(plies = board.ply(), %outcome, %winner, fen = %board, "finished");
    println!("{}", moves.join(" "));
}
