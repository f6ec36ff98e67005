use log::trace;
use serde::{Deserialize, Serialize};

use crate::error::{ChessError, ChessResult};
use crate::moves::{parse_square, Move, Square};
use crate::piece::{Color, Piece, PieceKind};

/// Row 0 is Black's back rank, row 7 White's; col 0 is file a.
pub type Grid = [[Option<Piece>; 8]; 8];

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const KNIGHT_OFFSETS: [(i32, i32); 8] =
    [(-2, -1), (-2, 1), (-1, -2), (-1, 2), (1, -2), (1, 2), (2, -1), (2, 1)];
const KING_OFFSETS: [(i32, i32); 8] =
    [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];
const ROOK_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const BISHOP_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct CastleRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastleRights {
    pub const ALL: CastleRights = CastleRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    pub const NONE: CastleRights = CastleRights {
        white_kingside: false,
        white_queenside: false,
        black_kingside: false,
        black_queenside: false,
    };

    pub fn kingside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_kingside,
            Color::Black => self.black_kingside,
        }
    }

    pub fn queenside(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_queenside,
            Color::Black => self.black_queenside,
        }
    }

    fn revoke_all(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_kingside = false;
                self.white_queenside = false;
            }
            Color::Black => {
                self.black_kingside = false;
                self.black_queenside = false;
            }
        }
    }

    /// Clear the right tied to `color`'s rook starting on `sq`, if it is one
    /// of that side's rook home squares.
    fn revoke_rook_home(&mut self, color: Color, sq: Square) {
        if sq.0 != color.back_rank() {
            return;
        }
        match (color, sq.1) {
            (Color::White, 0) => self.white_queenside = false,
            (Color::White, 7) => self.white_kingside = false,
            (Color::Black, 0) => self.black_queenside = false,
            (Color::Black, 7) => self.black_kingside = false,
            _ => {}
        }
    }

    /// True if no right is set here that `earlier` did not also have.
    pub fn is_subset_of(&self, earlier: &CastleRights) -> bool {
        (!self.white_kingside || earlier.white_kingside)
            && (!self.white_queenside || earlier.white_queenside)
            && (!self.black_kingside || earlier.black_kingside)
            && (!self.black_queenside || earlier.black_queenside)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum Outcome {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
}

/// Full game state: grid, side to move, the king-square cache, terminal
/// flags, and the three history logs.
///
/// The en-passant and castle-rights logs always hold one more entry than the
/// move log: both are seeded at construction, pushed by `make_move` and
/// popped by `undo_move`. Their last entry is the current value.
#[derive(Clone, Debug)]
pub struct GameState {
    squares: Grid,
    side_to_move: Color,
    white_king: Square,
    black_king: Square,
    checkmate: bool,
    stalemate: bool,
    en_passant_target: Option<Square>,
    castle_rights: CastleRights,
    move_log: Vec<Move>,
    en_passant_log: Vec<Option<Square>>,
    castle_rights_log: Vec<CastleRights>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Standard starting position, White to move, all castling rights.
    pub fn new() -> Self {
        let mut squares: Grid = [[None; 8]; 8];
        let back = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for (col, &kind) in back.iter().enumerate() {
            squares[0][col] = Some(Piece::new(kind, Color::Black));
            squares[1][col] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            squares[6][col] = Some(Piece::new(PieceKind::Pawn, Color::White));
            squares[7][col] = Some(Piece::new(kind, Color::White));
        }
        Self::from_parts(squares, Color::White, (7, 4), (0, 4), CastleRights::ALL, None)
    }

    fn from_parts(
        squares: Grid,
        side_to_move: Color,
        white_king: Square,
        black_king: Square,
        castle_rights: CastleRights,
        en_passant_target: Option<Square>,
    ) -> Self {
        GameState {
            squares,
            side_to_move,
            white_king,
            black_king,
            checkmate: false,
            stalemate: false,
            en_passant_target,
            castle_rights,
            move_log: Vec::new(),
            en_passant_log: vec![en_passant_target],
            castle_rights_log: vec![castle_rights],
        }
    }

    /// Set up a position from FEN. Only the placement, side-to-move,
    /// castling and en-passant fields are read; the clocks are ignored.
    /// Each side must have exactly one king.
    pub fn from_fen(fen: &str) -> ChessResult<Self> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(ChessError::fen("expected at least placement and side to move"));
        }

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ChessError::fen(format!("expected 8 ranks, found {}", ranks.len())));
        }

        let mut squares: Grid = [[None; 8]; 8];
        let mut white_kings = Vec::new();
        let mut black_kings = Vec::new();
        for (row, rank) in ranks.iter().enumerate() {
            let mut col = 0usize;
            for ch in rank.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    col += skip as usize;
                } else {
                    let kind = PieceKind::from_letter(ch)
                        .ok_or_else(|| ChessError::fen(format!("unknown piece `{ch}`")))?;
                    let color = if ch.is_ascii_uppercase() { Color::White } else { Color::Black };
                    if col >= 8 {
                        return Err(ChessError::fen(format!("rank `{rank}` is too long")));
                    }
                    squares[row][col] = Some(Piece::new(kind, color));
                    if kind == PieceKind::King {
                        match color {
                            Color::White => white_kings.push((row, col)),
                            Color::Black => black_kings.push((row, col)),
                        }
                    }
                    col += 1;
                }
                if col > 8 {
                    return Err(ChessError::fen(format!("rank `{rank}` is too long")));
                }
            }
            if col != 8 {
                return Err(ChessError::fen(format!("rank `{rank}` does not cover 8 files")));
            }
        }

        let (white_king, black_king) = match (white_kings.as_slice(), black_kings.as_slice()) {
            ([w], [b]) => (*w, *b),
            _ => return Err(ChessError::fen("each side needs exactly one king")),
        };

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(ChessError::fen(format!("bad side to move `{other}`"))),
        };

        let mut rights = CastleRights::NONE;
        let castling = fields.get(2).copied().unwrap_or("-");
        if castling != "-" {
            for ch in castling.chars() {
                match ch {
                    'K' => rights.white_kingside = true,
                    'Q' => rights.white_queenside = true,
                    'k' => rights.black_kingside = true,
                    'q' => rights.black_queenside = true,
                    _ => return Err(ChessError::fen(format!("bad castling field `{castling}`"))),
                }
            }
        }

        let en_passant = match fields.get(3).copied().unwrap_or("-") {
            "-" => None,
            name => {
                let target = parse_square(name).map_err(|e| ChessError::fen(e.to_string()))?;
                if !en_passant_plausible(&squares, target, side_to_move) {
                    return Err(ChessError::fen(format!(
                        "en-passant square `{name}` has no pawn that just advanced past it"
                    )));
                }
                Some(target)
            }
        };

        let state =
            Self::from_parts(squares, side_to_move, white_king, black_king, rights, en_passant);
        let (kr, kc) = state.king_square(side_to_move.opposite());
        if state.is_square_attacked_by(kr, kc, side_to_move) {
            return Err(ChessError::fen("the side not to move is in check"));
        }
        Ok(state)
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    pub fn squares(&self) -> &Grid {
        &self.squares
    }

    pub fn piece_at(&self, (row, col): Square) -> Option<Piece> {
        self.squares[row][col]
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn white_to_move(&self) -> bool {
        self.side_to_move == Color::White
    }

    pub fn king_square(&self, color: Color) -> Square {
        match color {
            Color::White => self.white_king,
            Color::Black => self.black_king,
        }
    }

    /// Set by `get_legal_moves` when the side to move has no moves and is in
    /// check; cleared by `undo_move`.
    pub fn checkmate(&self) -> bool {
        self.checkmate
    }

    pub fn stalemate(&self) -> bool {
        self.stalemate
    }

    pub fn outcome(&self) -> Outcome {
        if self.checkmate {
            Outcome::Checkmate { winner: self.side_to_move.opposite() }
        } else if self.stalemate {
            Outcome::Stalemate
        } else {
            Outcome::Ongoing
        }
    }

    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    pub fn castle_rights(&self) -> CastleRights {
        self.castle_rights
    }

    pub fn move_log(&self) -> &[Move] {
        &self.move_log
    }

    pub fn en_passant_log(&self) -> &[Option<Square>] {
        &self.en_passant_log
    }

    pub fn castle_rights_log(&self) -> &[CastleRights] {
        &self.castle_rights_log
    }

    /// 64 two-character cells ("wK", "bp", "--") in row order followed by
    /// "w" or "b" for the side to move. Identifies the grid and turn only.
    pub fn board_string(&self) -> String {
        let mut out = String::with_capacity(129);
        for row in &self.squares {
            for cell in row {
                match cell {
                    Some(p) => out.push_str(&p.code()),
                    None => out.push_str("--"),
                }
            }
        }
        out.push(self.side_to_move.prefix());
        out
    }

    // -------------------------------------------------------------------------
    // Make / undo
    // -------------------------------------------------------------------------

    /// Apply a move produced by the generators for this position. No legality
    /// check is done. Every call must be matched by one `undo_move`, in
    /// reverse order.
    pub fn make_move(&mut self, mv: &Move) {
        let (fr, fc) = mv.from();
        let (tr, tc) = mv.to();
        let piece = mv.piece_moved();

        self.squares[fr][fc] = None;
        self.squares[tr][tc] = Some(piece);
        self.move_log.push(*mv);
        self.side_to_move = self.side_to_move.opposite();

        if piece.kind == PieceKind::King {
            self.set_king_square(piece.color, (tr, tc));
        }

        if mv.is_promotion() {
            self.squares[tr][tc] = Some(Piece::new(PieceKind::Queen, piece.color));
        }

        // The captured pawn sits beside the mover, on the start row.
        if mv.is_en_passant() {
            self.squares[fr][tc] = None;
        }

        self.en_passant_target = if piece.kind == PieceKind::Pawn && fr.abs_diff(tr) == 2 {
            Some(((fr + tr) / 2, fc))
        } else {
            None
        };
        self.en_passant_log.push(self.en_passant_target);

        self.update_castle_rights(mv);
        self.castle_rights_log.push(self.castle_rights);

        if mv.is_castle() {
            if tc > fc {
                self.squares[tr][5] = self.squares[tr][7].take();
            } else {
                self.squares[tr][3] = self.squares[tr][0].take();
            }
        }

        self.debug_check_invariants();
    }

    fn update_castle_rights(&mut self, mv: &Move) {
        let piece = mv.piece_moved();
        match piece.kind {
            PieceKind::King => self.castle_rights.revoke_all(piece.color),
            PieceKind::Rook => self.castle_rights.revoke_rook_home(piece.color, mv.from()),
            _ => {}
        }
        if let Some(captured) = mv.piece_captured() {
            if captured.kind == PieceKind::Rook {
                self.castle_rights.revoke_rook_home(captured.color, mv.to());
            }
        }
    }

    /// Take back the last move. Does nothing when the move log is empty.
    pub fn undo_move(&mut self) {
        let Some(mv) = self.move_log.pop() else {
            return;
        };
        let (fr, fc) = mv.from();
        let (tr, tc) = mv.to();
        let piece = mv.piece_moved();

        self.squares[fr][fc] = Some(piece);
        self.squares[tr][tc] = mv.piece_captured();
        self.side_to_move = self.side_to_move.opposite();

        if piece.kind == PieceKind::King {
            self.set_king_square(piece.color, (fr, fc));
        }

        if mv.is_en_passant() {
            self.squares[tr][tc] = None;
            self.squares[fr][tc] = mv.piece_captured();
        }

        self.en_passant_log.pop();
        self.en_passant_target = self.en_passant_log.last().copied().flatten();

        self.castle_rights_log.pop();
        if let Some(&rights) = self.castle_rights_log.last() {
            self.castle_rights = rights;
        }

        if mv.is_castle() {
            if tc > fc {
                self.squares[tr][7] = self.squares[tr][5].take();
            } else {
                self.squares[tr][0] = self.squares[tr][3].take();
            }
        }

        self.checkmate = false;
        self.stalemate = false;

        self.debug_check_invariants();
    }

    fn set_king_square(&mut self, color: Color, sq: Square) {
        match color {
            Color::White => self.white_king = sq,
            Color::Black => self.black_king = sq,
        }
    }

    fn debug_check_invariants(&self) {
        debug_assert_eq!(self.en_passant_log.len(), self.move_log.len() + 1);
        debug_assert_eq!(self.castle_rights_log.len(), self.move_log.len() + 1);
        debug_assert_eq!(
            self.piece_at(self.white_king),
            Some(Piece::new(PieceKind::King, Color::White)),
            "white king cache out of sync"
        );
        debug_assert_eq!(
            self.piece_at(self.black_king),
            Some(Piece::new(PieceKind::King, Color::Black)),
            "black king cache out of sync"
        );
    }

    // -------------------------------------------------------------------------
    // Legal moves and check detection
    // -------------------------------------------------------------------------

    /// All legal moves for the side to move. Also sets `checkmate` or
    /// `stalemate` when the list comes back empty.
    pub fn get_legal_moves(&mut self) -> Vec<Move> {
        let saved_en_passant = self.en_passant_target;
        let saved_rights = self.castle_rights;
        let mover = self.side_to_move;

        let mut moves = self.pseudo_legal_moves();
        self.castle_moves(&mut moves);

        moves.retain(|mv| {
            self.make_move(mv);
            let (kr, kc) = self.king_square(mover);
            let exposed = self.is_square_attacked_by(kr, kc, mover.opposite());
            self.undo_move();
            !exposed
        });

        if moves.is_empty() {
            if self.is_in_check() {
                trace!("checkmate: {mover:?} to move has no legal moves");
                self.checkmate = true;
                self.stalemate = false;
            } else {
                trace!("stalemate: {mover:?} to move has no legal moves");
                self.stalemate = true;
                self.checkmate = false;
            }
        } else {
            self.checkmate = false;
            self.stalemate = false;
        }

        // make/undo round-trips these through the logs; nothing to repair.
        debug_assert_eq!(self.en_passant_target, saved_en_passant);
        debug_assert_eq!(self.castle_rights, saved_rights);
        self.en_passant_target = saved_en_passant;
        self.castle_rights = saved_rights;

        moves
    }

    /// Is the side to move's king attacked?
    pub fn is_in_check(&self) -> bool {
        let (kr, kc) = self.king_square(self.side_to_move);
        self.is_square_attacked(kr, kc)
    }

    /// Is (row, col) attacked by the side not to move?
    ///
    /// On an empty square this is not the same as "some opponent move lands
    /// here": a pawn push does not count and a pawn diagonal does.
    pub fn is_square_attacked(&self, row: usize, col: usize) -> bool {
        self.is_square_attacked_by(row, col, self.side_to_move.opposite())
    }

    /// Scans outward from the target square instead of generating every
    /// attacker move. Pawns attack diagonally whether or not the square is
    /// occupied; pawn pushes never attack.
    pub fn is_square_attacked_by(&self, row: usize, col: usize, attacker: Color) -> bool {
        let holds = |r: i32, c: i32, kinds: &[PieceKind]| -> bool {
            in_bounds(r, c)
                && self.squares[r as usize][c as usize]
                    .map(|p| p.color == attacker && kinds.contains(&p.kind))
                    .unwrap_or(false)
        };
        let (row, col) = (row as i32, col as i32);

        if KNIGHT_OFFSETS.iter().any(|&(dr, dc)| holds(row + dr, col + dc, &[PieceKind::Knight])) {
            return true;
        }
        if KING_OFFSETS.iter().any(|&(dr, dc)| holds(row + dr, col + dc, &[PieceKind::King])) {
            return true;
        }

        // A pawn one row behind the target (from its own point of view)
        // attacks it diagonally.
        let pawn_row = row - pawn_direction(attacker);
        if [-1, 1].iter().any(|&dc| holds(pawn_row, col + dc, &[PieceKind::Pawn])) {
            return true;
        }

        let slides = |dirs: &[(i32, i32)], kinds: &[PieceKind]| -> bool {
            dirs.iter().any(|&(dr, dc)| {
                let (mut r, mut c) = (row + dr, col + dc);
                while in_bounds(r, c) {
                    if self.squares[r as usize][c as usize].is_some() {
                        return holds(r, c, kinds);
                    }
                    r += dr;
                    c += dc;
                }
                false
            })
        };

        slides(&ROOK_DIRS, &[PieceKind::Rook, PieceKind::Queen])
            || slides(&BISHOP_DIRS, &[PieceKind::Bishop, PieceKind::Queen])
    }

    // -------------------------------------------------------------------------
    // Pseudo-legal generation
    // -------------------------------------------------------------------------

    /// Every move obeying piece movement for the side to move, ignoring own
    /// king safety. Castling is not included.
    pub fn pseudo_legal_moves(&self) -> Vec<Move> {
        let color = self.side_to_move;
        let mut moves = Vec::with_capacity(48);

        for row in 0..8usize {
            for col in 0..8usize {
                let Some(piece) = self.squares[row][col] else {
                    continue;
                };
                if piece.color != color {
                    continue;
                }
                match piece.kind {
                    PieceKind::Pawn => self.pawn_moves(row, col, piece, &mut moves),
                    PieceKind::Knight => {
                        self.step_moves(row, col, piece, &KNIGHT_OFFSETS, &mut moves)
                    }
                    PieceKind::Bishop => {
                        self.sliding_moves(row, col, piece, &BISHOP_DIRS, &mut moves)
                    }
                    PieceKind::Rook => self.sliding_moves(row, col, piece, &ROOK_DIRS, &mut moves),
                    PieceKind::Queen => {
                        self.sliding_moves(row, col, piece, &ROOK_DIRS, &mut moves);
                        self.sliding_moves(row, col, piece, &BISHOP_DIRS, &mut moves);
                    }
                    PieceKind::King => self.step_moves(row, col, piece, &KING_OFFSETS, &mut moves),
                }
            }
        }

        moves
    }

    fn pawn_moves(&self, row: usize, col: usize, pawn: Piece, moves: &mut Vec<Move>) {
        let dir = pawn_direction(pawn.color);
        let start_row = match pawn.color {
            Color::White => 6,
            Color::Black => 1,
        };
        let forward = row as i32 + dir;
        if !in_bounds(forward, col as i32) {
            return;
        }
        let fwd = forward as usize;

        if self.squares[fwd][col].is_none() {
            moves.push(Move::new((row, col), (fwd, col), pawn, &self.squares));
            let double = forward + dir;
            if row == start_row
                && in_bounds(double, col as i32)
                && self.squares[double as usize][col].is_none()
            {
                moves.push(Move::new((row, col), (double as usize, col), pawn, &self.squares));
            }
        }

        for dc in [-1i32, 1] {
            let c = col as i32 + dc;
            if !in_bounds(forward, c) {
                continue;
            }
            let target = (fwd, c as usize);
            match self.squares[target.0][target.1] {
                Some(p) if p.color != pawn.color => {
                    moves.push(Move::new((row, col), target, pawn, &self.squares));
                }
                None if self.en_passant_target == Some(target) => {
                    moves.push(Move::en_passant((row, col), target, pawn));
                }
                _ => {}
            }
        }
    }

    /// Knight and king: fixed offsets, any square not holding a friendly piece.
    fn step_moves(
        &self,
        row: usize,
        col: usize,
        piece: Piece,
        offsets: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for &(dr, dc) in offsets {
            let (r, c) = (row as i32 + dr, col as i32 + dc);
            if !in_bounds(r, c) {
                continue;
            }
            let target = (r as usize, c as usize);
            if self.squares[target.0][target.1].map(|p| p.color == piece.color).unwrap_or(false) {
                continue;
            }
            moves.push(Move::new((row, col), target, piece, &self.squares));
        }
    }

    fn sliding_moves(
        &self,
        row: usize,
        col: usize,
        piece: Piece,
        directions: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for &(dr, dc) in directions {
            let (mut r, mut c) = (row as i32 + dr, col as i32 + dc);
            while in_bounds(r, c) {
                let target = (r as usize, c as usize);
                if let Some(p) = self.squares[target.0][target.1] {
                    if p.color != piece.color {
                        moves.push(Move::new((row, col), target, piece, &self.squares));
                    }
                    break;
                }
                moves.push(Move::new((row, col), target, piece, &self.squares));
                r += dr;
                c += dc;
            }
        }
    }

    /// Castling for the side to move: the right must still be held, the king
    /// must not be in check, the squares between king and rook must be empty,
    /// and the squares the king crosses and lands on must not be attacked.
    fn castle_moves(&self, moves: &mut Vec<Move>) {
        let color = self.side_to_move;
        let enemy = color.opposite();
        let (r, c) = self.king_square(color);
        if (r, c) != (color.back_rank(), 4) || self.is_square_attacked_by(r, c, enemy) {
            return;
        }
        let king = Piece::new(PieceKind::King, color);
        let rook = Some(Piece::new(PieceKind::Rook, color));
        let empty = |cols: &[usize]| cols.iter().all(|&cc| self.squares[r][cc].is_none());
        let safe =
            |cols: &[usize]| cols.iter().all(|&cc| !self.is_square_attacked_by(r, cc, enemy));

        if self.castle_rights.kingside(color)
            && self.squares[r][7] == rook
            && empty(&[5, 6])
            && safe(&[5, 6])
        {
            moves.push(Move::castle((r, c), (r, 6), king));
        }
        if self.castle_rights.queenside(color)
            && self.squares[r][0] == rook
            && empty(&[1, 2, 3])
            && safe(&[2, 3])
        {
            moves.push(Move::castle((r, c), (r, 2), king));
        }
    }

    /// Leaf count of the legal move tree to `depth` plies.
    pub fn perft(&mut self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.get_legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut nodes = 0;
        for mv in &moves {
            self.make_move(mv);
            nodes += self.perft(depth - 1);
            self.undo_move();
        }
        nodes
    }
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..8).contains(&row) && (0..8).contains(&col)
}

/// Row delta of a pawn step: White moves toward row 0.
fn pawn_direction(color: Color) -> i32 {
    match color {
        Color::White => -1,
        Color::Black => 1,
    }
}

/// An en-passant target sits on the square an enemy pawn skipped with its
/// double step: empty, with that pawn directly beyond it.
fn en_passant_plausible(squares: &Grid, (row, col): Square, side_to_move: Color) -> bool {
    let enemy = side_to_move.opposite();
    let dir = pawn_direction(enemy);
    let skipped_row = enemy.back_rank() as i32 + 2 * dir;
    let pawn_row = skipped_row + dir;
    row as i32 == skipped_row
        && squares[row][col].is_none()
        && squares[pawn_row as usize][col] == Some(Piece::new(PieceKind::Pawn, enemy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::find_move;

    /// Play a sequence of coordinate moves, each checked against the legal list.
    fn play(state: &mut GameState, line: &[&str]) {
        for text in line {
            let legal = state.get_legal_moves();
            let mv = find_move(&legal, text).unwrap_or_else(|e| panic!("{e}"));
            state.make_move(&mv);
        }
    }

    fn castle_notations(moves: &[Move]) -> Vec<String> {
        moves.iter().filter(|m| m.is_castle()).map(|m| m.notation()).collect()
    }

    fn piece(kind: PieceKind, color: Color) -> Option<Piece> {
        Some(Piece::new(kind, color))
    }

    #[test]
    fn opening_position_has_twenty_moves() {
        let mut state = GameState::new();
        let moves = state.get_legal_moves();
        assert_eq!(moves.len(), 20);
        let pawn_moves = moves.iter().filter(|m| m.piece_moved().kind == PieceKind::Pawn).count();
        assert_eq!(pawn_moves, 16);
        assert!(!state.checkmate() && !state.stalemate());
    }

    #[test]
    fn new_matches_start_fen() {
        let fresh = GameState::new();
        let parsed = GameState::from_fen(START_FEN).expect("start FEN parses");
        assert_eq!(fresh.board_string(), parsed.board_string());
        assert_eq!(parsed.castle_rights(), CastleRights::ALL);
        assert_eq!(parsed.en_passant_target(), None);
        assert_eq!(parsed.king_square(Color::White), (7, 4));
        assert_eq!(parsed.king_square(Color::Black), (0, 4));
    }

    #[test]
    fn board_string_of_start_position() {
        let s = GameState::new().board_string();
        assert_eq!(s.len(), 129);
        assert!(s.starts_with("bRbNbBbQbKbBbNbR"));
        assert!(s.ends_with("wRwNwBwQwKwBwNwRw"));
        assert_eq!(&s[32..48], "----------------");
    }

    #[test]
    fn fools_mate_is_checkmate() {
        let mut state = GameState::new();
        play(&mut state, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        let moves = state.get_legal_moves();
        assert!(moves.is_empty());
        assert!(state.checkmate());
        assert!(!state.stalemate());
        assert!(state.is_in_check());
        assert_eq!(state.outcome(), Outcome::Checkmate { winner: Color::Black });
    }

    #[test]
    fn undo_clears_terminal_flags() {
        let mut state = GameState::new();
        play(&mut state, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        state.get_legal_moves();
        assert!(state.checkmate());
        state.undo_move();
        assert!(!state.checkmate());
        assert_eq!(state.outcome(), Outcome::Ongoing);
    }

    #[test]
    fn cornered_king_is_stalemated() {
        let mut state = GameState::from_fen("k7/8/1Q6/8/8/8/8/1K6 b - - 0 1").expect("valid FEN");
        let moves = state.get_legal_moves();
        assert!(moves.is_empty());
        assert!(state.stalemate());
        assert!(!state.checkmate());
        assert_eq!(state.outcome(), Outcome::Stalemate);
    }

    #[test]
    fn en_passant_capture_removes_the_passed_pawn() {
        let mut state = GameState::new();
        play(&mut state, &["e2e4", "a7a6", "e4e5", "d7d5"]);
        assert_eq!(state.en_passant_target(), Some((2, 3)));

        let moves = state.get_legal_moves();
        let ep: Vec<&Move> = moves.iter().filter(|m| m.is_en_passant()).collect();
        assert_eq!(ep.len(), 1);
        assert_eq!(ep[0].notation(), "e5d6");
        assert_eq!(ep[0].piece_captured(), piece(PieceKind::Pawn, Color::Black));

        let mv = *ep[0];
        state.make_move(&mv);
        assert_eq!(state.piece_at((2, 3)), piece(PieceKind::Pawn, Color::White));
        assert_eq!(state.piece_at((3, 3)), None, "passed pawn must be removed");
        assert_eq!(state.piece_at((3, 4)), None);

        state.undo_move();
        assert_eq!(state.piece_at((3, 3)), piece(PieceKind::Pawn, Color::Black));
        assert_eq!(state.piece_at((3, 4)), piece(PieceKind::Pawn, Color::White));
        assert_eq!(state.piece_at((2, 3)), None);
        assert_eq!(state.en_passant_target(), Some((2, 3)));
    }

    #[test]
    fn en_passant_expires_after_one_ply() {
        let mut state = GameState::new();
        play(&mut state, &["e2e4", "a7a6", "e4e5", "d7d5", "h2h3", "h7h6"]);
        assert_eq!(state.en_passant_target(), None);
        let moves = state.get_legal_moves();
        assert!(!moves.iter().any(|m| m.is_en_passant()));
    }

    #[test]
    fn castling_both_sides_moves_the_rook() {
        let mut state =
            GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("valid FEN");
        let moves = state.get_legal_moves();
        assert_eq!(castle_notations(&moves), vec!["e1g1", "e1c1"]);

        let short = find_move(&moves, "e1g1").expect("kingside castle available");
        state.make_move(&short);
        assert_eq!(state.piece_at((7, 6)), piece(PieceKind::King, Color::White));
        assert_eq!(state.piece_at((7, 5)), piece(PieceKind::Rook, Color::White));
        assert_eq!(state.piece_at((7, 7)), None);
        assert_eq!(state.king_square(Color::White), (7, 6));
        assert!(!state.castle_rights().white_kingside);
        assert!(!state.castle_rights().white_queenside);
        assert!(state.castle_rights().black_queenside);

        let reply = state.get_legal_moves();
        let long = find_move(&reply, "e8c8").expect("queenside castle available");
        state.make_move(&long);
        assert_eq!(state.piece_at((0, 2)), piece(PieceKind::King, Color::Black));
        assert_eq!(state.piece_at((0, 3)), piece(PieceKind::Rook, Color::Black));
        assert_eq!(state.piece_at((0, 0)), None);

        state.undo_move();
        state.undo_move();
        let home = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("valid FEN");
        assert_eq!(state.board_string(), home.board_string());
        assert_eq!(state.castle_rights(), CastleRights::ALL);
        assert_eq!(state.king_square(Color::White), (7, 4));
        assert_eq!(state.king_square(Color::Black), (0, 4));
    }

    #[test]
    fn no_castling_through_or_out_of_check() {
        // Black rook on f8 covers f1: kingside is out, queenside is fine.
        let mut state =
            GameState::from_fen("4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1").expect("valid FEN");
        assert_eq!(castle_notations(&state.get_legal_moves()), vec!["e1c1"]);

        // In check from e8: no castling at all.
        let mut state =
            GameState::from_fen("3kr3/8/8/8/8/8/8/R3K2R w KQ - 0 1").expect("valid FEN");
        assert!(!state.get_legal_moves().iter().any(|m| m.is_castle()));

        // A black pawn on c2 attacks d1 even though d1 is empty.
        let mut state =
            GameState::from_fen("4k3/8/8/8/8/8/2p5/R3K2R w KQ - 0 1").expect("valid FEN");
        assert_eq!(castle_notations(&state.get_legal_moves()), vec!["e1g1"]);
    }

    #[test]
    fn queenside_needs_b_file_empty() {
        let mut state = GameState::from_fen("4k3/8/8/8/8/8/8/RN2K3 w Q - 0 1").expect("valid FEN");
        assert!(!state.get_legal_moves().iter().any(|m| m.is_castle()));
    }

    #[test]
    fn capturing_a_home_rook_revokes_its_right() {
        let mut state =
            GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("valid FEN");
        play(&mut state, &["a1a8"]);
        let rights = state.castle_rights();
        assert!(!rights.white_queenside, "rook left its home square");
        assert!(!rights.black_queenside, "rook captured on its home square");
        assert!(rights.white_kingside && rights.black_kingside);
        state.undo_move();
        assert_eq!(state.castle_rights(), CastleRights::ALL);
    }

    #[test]
    fn king_move_revokes_both_rights() {
        let mut state =
            GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").expect("valid FEN");
        play(&mut state, &["e1f1", "e8d8", "f1e1"]);
        let rights = state.castle_rights();
        assert!(!rights.white_kingside && !rights.white_queenside);
        assert!(!rights.black_kingside && !rights.black_queenside);
        assert!(!state.get_legal_moves().iter().any(|m| m.is_castle()));
    }

    #[test]
    fn promotion_always_makes_a_queen() {
        let mut state = GameState::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").expect("valid FEN");
        let moves = state.get_legal_moves();
        let promos: Vec<&Move> = moves.iter().filter(|m| m.is_promotion()).collect();
        assert_eq!(promos.len(), 1, "one promotion move, no under-promotion variants");
        let mv = *promos[0];
        state.make_move(&mv);
        assert_eq!(state.piece_at((0, 0)), piece(PieceKind::Queen, Color::White));
        state.undo_move();
        assert_eq!(state.piece_at((1, 0)), piece(PieceKind::Pawn, Color::White));
        assert_eq!(state.piece_at((0, 0)), None);
    }

    #[test]
    fn undo_on_empty_log_is_a_no_op() {
        let mut state = GameState::new();
        let before = state.board_string();
        state.undo_move();
        assert_eq!(state.board_string(), before);
        assert!(state.move_log().is_empty());
        assert_eq!(state.en_passant_log().len(), 1);
        assert_eq!(state.castle_rights_log().len(), 1);
    }

    #[test]
    fn logs_stay_one_longer_than_move_log() {
        let mut state = GameState::new();
        play(&mut state, &["e2e4", "e7e5", "g1f3"]);
        assert_eq!(state.move_log().len(), 3);
        assert_eq!(state.en_passant_log().len(), 4);
        assert_eq!(state.castle_rights_log().len(), 4);
        state.undo_move();
        assert_eq!(state.en_passant_log().len(), 3);
        assert_eq!(state.castle_rights_log().len(), 3);
        assert_eq!(state.en_passant_target(), Some((2, 4)));
    }

    #[test]
    fn pinned_piece_cannot_move() {
        // White knight on e2 is pinned by the rook on e8.
        let mut state = GameState::from_fen("4r2k/8/8/8/8/8/4N3/4K3 w - - 0 1").expect("valid FEN");
        let moves = state.get_legal_moves();
        assert!(moves.iter().all(|m| m.from() != (6, 4)));
    }

    #[test]
    fn king_cache_follows_king() {
        let mut state = GameState::new();
        play(&mut state, &["e2e4", "e7e5", "e1e2"]);
        assert_eq!(state.king_square(Color::White), (6, 4));
        state.undo_move();
        assert_eq!(state.king_square(Color::White), (7, 4));
    }

    #[test]
    fn pawn_attacks_are_diagonal_only() {
        let state = GameState::from_fen("4k3/8/8/8/4p3/8/8/4K3 w - - 0 1").expect("valid FEN");
        // Black pawn on e4 attacks d3 and f3, not e3.
        assert!(state.is_square_attacked_by(5, 3, Color::Black));
        assert!(state.is_square_attacked_by(5, 5, Color::Black));
        assert!(!state.is_square_attacked_by(5, 4, Color::Black));
        assert!(state.is_square_attacked(5, 3));
    }

    #[test]
    fn bad_fen_is_rejected() {
        for fen in [
            "",
            "8/8/8/8/8/8/8/8 w - - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
            "rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            // En-passant square with no double-stepped pawn behind it.
            "8/3kP3/8/8/8/8/8/4K3 w - d8 0 1",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e3 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq e3 0 1",
            // Black is in check with White to move.
            "k7/8/2Q5/8/8/8/8/1K6 w - - 0 1",
        ] {
            assert!(
                matches!(GameState::from_fen(fen), Err(ChessError::InvalidFen { .. })),
                "accepted {fen:?}"
            );
        }
    }

    #[test]
    fn fen_en_passant_square_is_kept() {
        let fen = "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq e6 0 1";
        let state = GameState::from_fen(fen).expect("valid FEN");
        assert_eq!(state.en_passant_target(), Some((2, 4)));
    }
}
