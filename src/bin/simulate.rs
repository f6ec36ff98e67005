use std::error::Error;

use log::info;
use negachess::board::{GameState, Outcome};
use negachess::engine::{find_random_move, search, SearchConfig};
use negachess::piece::Color;
use rand::rngs::StdRng;
use rand::SeedableRng;

const MAX_PLIES: u32 = 150;
const DEFAULT_GAMES: usize = 10;
const DEFAULT_DEPTH: u32 = 2;

#[derive(Clone, Debug)]
enum Player {
    Search(SearchConfig),
    Random,
}

#[derive(Debug, Default)]
struct MatchResult {
    search_wins: u32,
    random_wins: u32,
    draws: u32,
}

/// Play one game and report who won, `None` for a draw or the ply limit.
fn play_game(white: &Player, black: &Player, rng: &mut StdRng) -> Option<Color> {
    let mut state = GameState::new();
    for _ in 0..MAX_PLIES {
        let legal = state.get_legal_moves();
        let player = if state.white_to_move() { white } else { black };
        let chosen = match player {
            Player::Search(config) => search(&mut state, &legal, config, rng).map(|r| r.mv),
            Player::Random => find_random_move(&legal, rng),
        };
        match chosen {
            Some(mv) => state.make_move(&mv),
            None => break,
        }
    }

    // Refresh the flags for the final position.
    state.get_legal_moves();
    match state.outcome() {
        Outcome::Checkmate { winner } => Some(winner),
        Outcome::Stalemate | Outcome::Ongoing => None,
    }
}

fn arg<T: std::str::FromStr>(index: usize, default: T) -> Result<T, Box<dyn Error>>
where
    T::Err: Error + 'static,
{
    match std::env::args().nth(index) {
        Some(text) => Ok(text.parse()?),
        None => Ok(default),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let depth: u32 = arg(1, DEFAULT_DEPTH)?;
    let games: usize = arg(2, DEFAULT_GAMES)?;
    let seed: u64 = arg(3, 0)?;

    let engine = Player::Search(SearchConfig { depth, ..SearchConfig::default() });
    let mut rng = StdRng::seed_from_u64(seed);
    let mut result = MatchResult::default();

    info!("negamax depth {depth} vs random mover, {games} games, seed {seed}");

    for game in 0..games {
        // Alternate colours so each side gets White half the time.
        let search_color = if game % 2 == 0 { Color::White } else { Color::Black };
        let (white, black) = match search_color {
            Color::White => (&engine, &Player::Random),
            Color::Black => (&Player::Random, &engine),
        };
        let winner = play_game(white, black, &mut rng);
        match winner {
            Some(c) if c == search_color => result.search_wins += 1,
            Some(_) => result.random_wins += 1,
            None => result.draws += 1,
        }
        info!("game {}: search as {search_color:?}, winner {winner:?}", game + 1);
    }

    println!(
        "search wins {}, random wins {}, draws {} (out of {games})",
        result.search_wins, result.random_wins, result.draws
    );
    Ok(())
}
