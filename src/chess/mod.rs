//! Implementation of chess environment, its rules and specifics.

// TODO: Re-export public types directly.
pub mod attacks;
pub mod bitboard;
pub mod core;
pub mod perft;
pub mod position;
pub mod zobrist;
mod generated;
