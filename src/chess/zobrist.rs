//! [Zobrist hashing] key type used to incrementally hash [`super::position::Position`].
//!
//! [Zobrist hashing]: https://www.chessprogramming.org/Zobrist_Hashing

/// Zobrist key is a 64-bit integer.
pub type Key = u64;
