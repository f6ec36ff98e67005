use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::board::Grid;
use crate::error::{ChessError, ChessResult};
use crate::piece::{Piece, PieceKind};

/// (row, col). Row 0 is Black's back rank (rank 8), col 0 is file a.
pub type Square = (usize, usize);

/// A move as produced by the generators. All flags are fixed at construction
/// from the grid the move was generated on; the value is never modified
/// afterwards.
///
/// Equality (and hashing) only look at the start and end squares.
#[derive(Clone, Copy, Serialize, Debug)]
pub struct Move {
    from: Square,
    to: Square,
    piece_moved: Piece,
    piece_captured: Option<Piece>,
    is_promotion: bool,
    is_en_passant: bool,
    is_castle: bool,
}

impl Move {
    /// Ordinary move or capture; whatever sits on `to` is the captured piece.
    pub(crate) fn new(from: Square, to: Square, piece: Piece, grid: &Grid) -> Self {
        let promotion_row = piece.color.opposite().back_rank();
        Move {
            from,
            to,
            piece_moved: piece,
            piece_captured: grid[to.0][to.1],
            is_promotion: piece.kind == PieceKind::Pawn && to.0 == promotion_row,
            is_en_passant: false,
            is_castle: false,
        }
    }

    /// Pawn capture onto the en-passant target. The landing square is empty,
    /// so the captured piece is the enemy pawn by definition.
    pub(crate) fn en_passant(from: Square, to: Square, piece: Piece) -> Self {
        Move {
            from,
            to,
            piece_moved: piece,
            piece_captured: Some(Piece::new(PieceKind::Pawn, piece.color.opposite())),
            is_promotion: false,
            is_en_passant: true,
            is_castle: false,
        }
    }

    /// King's two-square step; the rook relocation is implied.
    pub(crate) fn castle(from: Square, to: Square, king: Piece) -> Self {
        Move {
            from,
            to,
            piece_moved: king,
            piece_captured: None,
            is_promotion: false,
            is_en_passant: false,
            is_castle: true,
        }
    }

    pub fn from(&self) -> Square {
        self.from
    }

    pub fn to(&self) -> Square {
        self.to
    }

    pub fn piece_moved(&self) -> Piece {
        self.piece_moved
    }

    pub fn piece_captured(&self) -> Option<Piece> {
        self.piece_captured
    }

    pub fn is_capture(&self) -> bool {
        self.piece_captured.is_some()
    }

    pub fn is_promotion(&self) -> bool {
        self.is_promotion
    }

    pub fn is_en_passant(&self) -> bool {
        self.is_en_passant
    }

    pub fn is_castle(&self) -> bool {
        self.is_castle
    }

    /// Coordinate notation, e.g. "e2e4". Promotions carry no suffix since
    /// they always resolve to a queen.
    pub fn notation(&self) -> String {
        format!("{}{}", square_name(self.from), square_name(self.to))
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl Eq for Move {}

impl Hash for Move {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation())
    }
}

/// "a8" for (0, 0), "h1" for (7, 7).
pub fn square_name((row, col): Square) -> String {
    debug_assert!(row < 8 && col < 8, "square ({row}, {col}) off the board");
    let file = (b'a' + col as u8) as char;
    let rank = (b'8' - row as u8) as char;
    format!("{file}{rank}")
}

pub fn parse_square(name: &str) -> ChessResult<Square> {
    let bytes = name.as_bytes();
    if bytes.len() != 2 {
        return Err(ChessError::InvalidSquare(name.to_string()));
    }
    let (file, rank) = (bytes[0], bytes[1]);
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return Err(ChessError::InvalidSquare(name.to_string()));
    }
    Ok(((b'8' - rank) as usize, (file - b'a') as usize))
}

/// Split "e2e4" into its two squares. A trailing promotion letter is
/// accepted and ignored.
pub fn parse_notation(text: &str) -> ChessResult<(Square, Square)> {
    let invalid = || ChessError::InvalidNotation(text.to_string());
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(invalid());
    }
    if text.len() == 5 && PieceKind::from_letter(text.as_bytes()[4] as char).is_none() {
        return Err(invalid());
    }
    let from = parse_square(&text[0..2]).map_err(|_| invalid())?;
    let to = parse_square(&text[2..4]).map_err(|_| invalid())?;
    Ok((from, to))
}

/// Look up a coordinate-notation move among `moves` (normally the current
/// legal moves), returning the generated value so its flags are intact.
pub fn find_move(moves: &[Move], text: &str) -> ChessResult<Move> {
    let (from, to) = parse_notation(text)?;
    moves
        .iter()
        .find(|m| m.from == from && m.to == to)
        .copied()
        .ok_or_else(|| ChessError::IllegalMove(text.to_string()))
}
