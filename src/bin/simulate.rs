//! Baseline check for the search: plays a batch of minimax-vs-random games,
//! alternating colors, and tallies the results.
//!
//! Usage: simulate [config.json] [games]

use std::io::Write;

use chess_ai::engine::{pick_move, AiConfig, Policy};
use chess_ai::{Board, Color};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const MAX_PLIES: u32 = 200;
const DEFAULT_GAMES: usize = 10;

#[derive(Debug, Default)]
struct Tally {
    minimax_wins: u32,
    random_wins: u32,
    draws: u32,
    unfinished: u32,
}

/// Plays one game and returns the winner, `None` for a draw, or `Err` when
/// the ply limit cut the game short.
fn play_game(white: &AiConfig, black: &AiConfig) -> Result<Option<Color>, u32> {
    let mut board = Board::new();
    while !board.is_game_over() {
        if board.ply() >= MAX_PLIES {
            return Err(board.ply());
        }
        let config = match board.side_to_move() {
            Color::White => white,
            Color::Black => black,
        };
        match pick_move(&board, config) {
            Some(result) => {
                if !board.submit(&result.mv) {
                    error!(mv = %result.mv, fen = %board, "engine move rejected");
                    break;
                }
            }
            None => break,
        }
    }
    info!(outcome = ?board.outcome(), winner = ?board.winner(), plies = board.ply(), "game finished");
    Ok(board.winner())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let minimax = match args.next() {
        Some(path) => match AiConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(%path, "{e}");
                std::process::exit(1);
            }
        },
        None => AiConfig { depth: 2, ..AiConfig::new() },
    };
    if minimax.policy != Policy::Minimax {
        error!("config must use the minimax policy");
        std::process::exit(1);
    }
    let games = args.next().and_then(|n| n.parse().ok()).unwrap_or(DEFAULT_GAMES);
    let random = AiConfig::random();

    let mut tally = Tally::default();
    for game in 0..games {
        let minimax_color = if game % 2 == 0 { Color::White } else { Color::Black };
        let result = match minimax_color {
            Color::White => play_game(&minimax, &random),
            Color::Black => play_game(&random, &minimax),
        };
        match result {
            Ok(Some(winner)) if winner == minimax_color => tally.minimax_wins += 1,
            Ok(Some(_)) => tally.random_wins += 1,
            Ok(None) => tally.draws += 1,
            Err(plies) => {
                info!(plies, "ply limit reached");
                tally.unfinished += 1;
            }
        }
        print!(".");
        std::io::stdout().flush().ok();
    }
    println!();

    println!(
        "minimax (depth {}) vs random over {games} games: minimax wins {}, random wins {}, draws {}, unfinished {}",
        minimax.depth, tally.minimax_wins, tally.random_wins, tally.draws, tally.unfinished
    );
}
