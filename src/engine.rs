// =============================================================================
// Move search
//
// Negamax with alpha-beta pruning over a single GameState that is mutated in
// place with make_move / undo_move. Every make is paired with exactly one
// undo before the recursive call returns, so the caller's state (grid, logs,
// flags aside) is unchanged when a search finishes.
//
// Scores are in pawns from White's perspective: material plus a tenth of a
// piece-square table entry per piece. The search multiplies by the side's
// sign so every node maximises its own score.
//
// Not safe to run two searches over the same GameState at once; a parallel
// caller must clone the state per search.
// =============================================================================

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::GameState;
use crate::moves::Move;
use crate::piece::{Color, PieceKind};

// =============================================================================
// Constants
// =============================================================================

/// Score of a checkmate; also the initial "worst" value at every node.
pub const CHECKMATE: f64 = 1000.0;
pub const STALEMATE: f64 = 0.0;

/// Plies searched by `find_best_move`. Beyond 3 the search becomes slow.
pub const DEFAULT_DEPTH: u32 = 3;

/// Weight of the piece-square tables relative to material.
const POSITION_WEIGHT: f64 = 0.1;

type Table = [[u8; 8]; 8];

// Piece-square tables, indexed [row][col] with row 0 = rank 8. The same table
// is used for both colours. The king has no positional term.
const KNIGHT_TABLE: Table = [
    [1, 1, 1, 1, 1, 1, 1, 1],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [1, 3, 3, 3, 3, 3, 2, 1],
    [1, 3, 3, 4, 4, 3, 2, 1],
    [1, 3, 3, 4, 4, 3, 2, 1],
    [1, 3, 3, 3, 3, 3, 2, 1],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [1, 1, 1, 1, 1, 1, 1, 1],
];

const BISHOP_TABLE: Table = [
    [4, 0, 0, 0, 0, 0, 0, 4],
    [3, 4, 2, 2, 2, 2, 4, 3],
    [1, 3, 4, 3, 3, 4, 2, 1],
    [1, 3, 4, 4, 4, 4, 2, 1],
    [1, 3, 3, 4, 4, 3, 2, 1],
    [1, 3, 4, 3, 3, 4, 3, 1],
    [1, 4, 2, 2, 2, 2, 4, 3],
    [4, 0, 0, 0, 0, 0, 0, 4],
];

const ROOK_TABLE: Table = [
    [1, 1, 4, 4, 4, 3, 2, 1],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [1, 2, 2, 2, 2, 2, 2, 3],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [1, 3, 3, 3, 3, 3, 2, 3],
    [2, 2, 2, 2, 2, 2, 2, 2],
    [1, 1, 4, 4, 4, 4, 2, 1],
];

const QUEEN_TABLE: Table = [
    [1, 1, 4, 4, 4, 3, 2, 1],
    [1, 4, 4, 4, 2, 2, 2, 1],
    [1, 4, 4, 2, 2, 2, 2, 1],
    [1, 4, 4, 5, 5, 2, 2, 3],
    [1, 4, 4, 5, 5, 3, 3, 1],
    [1, 4, 4, 3, 3, 3, 2, 3],
    [2, 2, 3, 3, 3, 3, 3, 2],
    [1, 1, 2, 2, 2, 2, 2, 1],
];

const PAWN_TABLE: Table = [
    [10, 10, 10, 10, 10, 10, 10, 10],
    [2, 2, 2, 2, 2, 2, 2, 2],
    [3, 3, 3, 3, 3, 3, 3, 3],
    [4, 4, 4, 6, 6, 4, 4, 4],
    [4, 4, 4, 6, 6, 4, 4, 3],
    [1, 3, 3, 3, 3, 3, 3, 3],
    [2, 2, 2, 2, 2, 2, 2, 2],
    [10, 10, 10, 10, 10, 10, 10, 10],
];

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone, Debug)]
pub struct SearchConfig {
    /// Plies to search. 0 is treated as 1 so a move is always chosen.
    pub depth: u32,
    /// Shuffle the root moves so equal scores do not always resolve the
    /// same way.
    pub shuffle: bool,
    /// Prune with alpha-beta. Turning this off gives a full-width negamax
    /// with the same result and more nodes.
    pub alpha_beta: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: DEFAULT_DEPTH,
            shuffle: true,
            alpha_beta: true,
        }
    }
}

/// The move chosen at the root, its score for the side to move, and the
/// number of nodes visited.
#[derive(Clone, Debug)]
pub struct SearchResult {
    pub mv: Move,
    pub score: f64,
    pub nodes: u64,
}

// =============================================================================
// Evaluation
// =============================================================================

pub fn piece_value(kind: PieceKind) -> f64 {
    match kind {
        PieceKind::Pawn => 1.0,
        PieceKind::Knight => 3.0,
        PieceKind::Bishop => 3.0,
        PieceKind::Rook => 5.0,
        PieceKind::Queen => 9.0,
        PieceKind::King => 0.0,
    }
}

fn position_table(kind: PieceKind) -> Option<&'static Table> {
    match kind {
        PieceKind::Pawn => Some(&PAWN_TABLE),
        PieceKind::Knight => Some(&KNIGHT_TABLE),
        PieceKind::Bishop => Some(&BISHOP_TABLE),
        PieceKind::Rook => Some(&ROOK_TABLE),
        PieceKind::Queen => Some(&QUEEN_TABLE),
        PieceKind::King => None,
    }
}

/// Static score from White's perspective. Reads the terminal flags, so it is
/// only meaningful after `get_legal_moves` has run for this position.
pub fn evaluate(state: &GameState) -> f64 {
    if state.checkmate() {
        // The side to move has been mated.
        return match state.side_to_move() {
            Color::White => -CHECKMATE,
            Color::Black => CHECKMATE,
        };
    }
    if state.stalemate() {
        return STALEMATE;
    }

    let mut score = 0.0;
    for (row, cells) in state.squares().iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            if let Some(p) = cell {
                let positional = position_table(p.kind)
                    .map(|t| t[row][col] as f64 * POSITION_WEIGHT)
                    .unwrap_or(0.0);
                score += p.color.sign() * (piece_value(p.kind) + positional);
            }
        }
    }
    score
}

/// Material balance only, White positive.
pub fn score_material(state: &GameState) -> f64 {
    state
        .squares()
        .iter()
        .flatten()
        .flatten()
        .map(|p| p.color.sign() * piece_value(p.kind))
        .sum()
}

// =============================================================================
// Search
// =============================================================================

struct Search<'a> {
    state: &'a mut GameState,
    alpha_beta: bool,
    nodes: u64,
    best_move: Option<Move>,
}

impl Search<'_> {
    /// Negamax score of the position for the side whose sign is `turn_sign`.
    /// `moves` are that side's legal moves; with none left the node scores
    /// the `-CHECKMATE` floor. At `ply == 0` the best move so far is recorded.
    fn negamax(
        &mut self,
        moves: &[Move],
        depth: u32,
        ply: u32,
        mut alpha: f64,
        beta: f64,
        turn_sign: f64,
    ) -> f64 {
        self.nodes += 1;

        if depth == 0 {
            return turn_sign * evaluate(self.state);
        }

        let mut best = -CHECKMATE;
        for mv in moves {
            self.state.make_move(mv);
            let replies = self.state.get_legal_moves();
            let score = -self.negamax(&replies, depth - 1, ply + 1, -beta, -alpha, -turn_sign);
            self.state.undo_move();

            if score > best || (ply == 0 && self.best_move.is_none()) {
                best = best.max(score);
                if ply == 0 {
                    self.best_move = Some(*mv);
                }
            }
            if best > alpha {
                alpha = best;
            }
            if self.alpha_beta && alpha >= beta {
                break;
            }
        }

        best
    }
}

/// Pick a move for the side to move with the default configuration.
/// Returns `None` only when `legal_moves` is empty (checkmate or stalemate).
pub fn find_best_move(state: &mut GameState, legal_moves: &[Move]) -> Option<Move> {
    search(state, legal_moves, &SearchConfig::default(), &mut rand::thread_rng()).map(|r| r.mv)
}

/// Run the configured search from the root. `legal_moves` must be the
/// current legal moves of `state`; `state` is returned to its prior
/// contents before this returns.
pub fn search<R: Rng + ?Sized>(
    state: &mut GameState,
    legal_moves: &[Move],
    config: &SearchConfig,
    rng: &mut R,
) -> Option<SearchResult> {
    if legal_moves.is_empty() {
        return None;
    }

    let mut candidates = legal_moves.to_vec();
    if config.shuffle {
        candidates.shuffle(rng);
    }

    let depth = config.depth.max(1);
    let turn_sign = state.side_to_move().sign();
    let mut searcher = Search {
        state,
        alpha_beta: config.alpha_beta,
        nodes: 0,
        best_move: None,
    };
    let score = searcher.negamax(&candidates, depth, 0, -CHECKMATE, CHECKMATE, turn_sign);
    let nodes = searcher.nodes;
    let mv = searcher.best_move?;

    debug!("search depth {depth}: {mv} score {score:.2} after {nodes} nodes");
    Some(SearchResult { mv, score, nodes })
}

/// Uniformly random legal move; a baseline opponent.
pub fn find_random_move<R: Rng + ?Sized>(legal_moves: &[Move], rng: &mut R) -> Option<Move> {
    legal_moves.choose(rng).copied()
}
