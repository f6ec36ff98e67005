use std::error::Error;

use log::info;
use negachess::board::{GameState, Outcome, START_FEN};
use negachess::engine::{find_best_move, search, SearchConfig};
use serde::Serialize;

const MAX_PLIES: usize = 200;

#[derive(Serialize)]
struct GameRecord {
    start_fen: String,
    moves: Vec<String>,
    outcome: Outcome,
    final_board: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("selfplay (built {})", env!("BUILD_TIMESTAMP"));

    let depth: Option<u32> = std::env::args().nth(1).map(|d| d.parse::<u32>()).transpose()?;
    let start_fen = std::env::args().nth(2).unwrap_or_else(|| START_FEN.to_string());

    let mut state = GameState::from_fen(&start_fen)?;
    let mut rng = rand::thread_rng();

    while state.move_log().len() < MAX_PLIES {
        let legal = state.get_legal_moves();
        let chosen = match depth {
            Some(depth) => {
                let config = SearchConfig { depth, ..SearchConfig::default() };
                search(&mut state, &legal, &config, &mut rng).map(|r| r.mv)
            }
            None => find_best_move(&mut state, &legal),
        };
        let Some(mv) = chosen else {
            break;
        };
        info!("{:>3}. {:?} plays {mv}", state.move_log().len() + 1, state.side_to_move());
        state.make_move(&mv);
    }

    state.get_legal_moves();
    let record = GameRecord {
        start_fen,
        moves: state.move_log().iter().map(|m| m.notation()).collect(),
        outcome: state.outcome(),
        final_board: state.board_string(),
    };
    info!("game over after {} plies: {:?}", record.moves.len(), record.outcome);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
