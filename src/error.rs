//! Errors raised when text from outside the engine (square names, move
//! notation, FEN) cannot be turned into engine values.
//!
//! The rules core and the search never fail; these only appear at the
//! parsing boundary.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessError {
    /// Not a file letter a-h followed by a rank digit 1-8.
    #[error("invalid square `{0}`")]
    InvalidSquare(String),

    /// Coordinate move notation must be two square names, e.g. `e2e4`.
    #[error("invalid move notation `{0}`")]
    InvalidNotation(String),

    /// Well-formed notation that matches none of the supplied legal moves.
    #[error("move {0} is not legal in this position")]
    IllegalMove(String),

    #[error("invalid FEN: {reason}")]
    InvalidFen { reason: String },
}

impl ChessError {
    pub(crate) fn fen(reason: impl Into<String>) -> Self {
        ChessError::InvalidFen { reason: reason.into() }
    }
}

pub type ChessResult<T> = Result<T, ChessError>;
