pub mod board;
pub mod engine;
pub mod error;
pub mod moves;
pub mod piece;
