//! Perft (**per**formance **t**esting) drivers beyond the basic leaf counter
//! in [`super::position::perft`]: move-by-move "divide" output, a
//! classification of leaf nodes by move type, and a root-split parallel
//! driver.
//!
//! [Perft]: https://www.chessprogramming.org/Perft

use std::thread;

use crate::chess::core::Move;
use crate::chess::position::{perft, Position};

/// Per-root-move leaf node counts, as printed by `perft divide` in reference
/// engines: useful for finding the exact root move a move generator bug is
/// hiding behind, by diffing against a known-good engine's output.
#[must_use]
pub fn divide(position: &Position, depth: u8) -> Vec<(Move, u64)> {
    let mut result = Vec::new();
    for next_move in position.generate_moves() {
        let mut next_position = position.clone();
        next_position.make_move(&next_move);
        let nodes = if depth == 0 { 1 } else { perft(&next_position, depth - 1) };
        result.push((next_move, nodes));
    }
    result
}

/// Leaf nodes classified by what kind of move produced them: total node
/// count plus captures (including en passant), en passant captures
/// specifically, castles, promotions, checks and checkmates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PerftCounts {
    /// Total number of leaf positions.
    pub nodes: u64,
    /// Leaves reached by a move that captured a piece (en passant included).
    pub captures: u64,
    /// Leaves reached by an en passant capture.
    pub en_passant: u64,
    /// Leaves reached by a castling move.
    pub castles: u64,
    /// Leaves reached by a pawn promotion.
    pub promotions: u64,
    /// Leaves where the side to move is in check.
    pub checks: u64,
    /// Leaves where the side to move is in checkmate.
    pub checkmates: u64,
}

impl std::ops::Add for PerftCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            nodes: self.nodes + other.nodes,
            captures: self.captures + other.captures,
            en_passant: self.en_passant + other.en_passant,
            castles: self.castles + other.castles,
            promotions: self.promotions + other.promotions,
            checks: self.checks + other.checks,
            checkmates: self.checkmates + other.checkmates,
        }
    }
}

impl std::iter::Sum for PerftCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), std::ops::Add::add)
    }
}

fn is_castle(position: &Position, next_move: &Move) -> bool {
    matches!(
        position.at(next_move.from()).map(|piece| piece.kind),
        Some(crate::chess::core::PieceKind::King)
    ) && (next_move.from().file() as i8 - next_move.to().file() as i8).abs() > 1
}

fn is_capture(position: &Position, next_move: &Move) -> bool {
    position.at(next_move.to()).is_some() || is_en_passant(position, next_move)
}

fn is_en_passant(position: &Position, next_move: &Move) -> bool {
    matches!(
        position.at(next_move.from()).map(|piece| piece.kind),
        Some(crate::chess::core::PieceKind::Pawn)
    ) && next_move.to().file() != next_move.from().file()
        && position.at(next_move.to()).is_none()
}

/// Classifies every leaf node at `depth`, recursing the same way
/// [`super::position::perft`] does but tracking per-leaf move metadata
/// through the recursion. Grounded in the classical `perft_advanced`
/// technique: classify a leaf by the *last* move made to reach it.
#[must_use]
pub fn advanced(position: &Position, depth: u8) -> PerftCounts {
    if depth == 0 {
        return PerftCounts {
            nodes: 1,
            checks: u64::from(position.in_check()),
            checkmates: u64::from(position.in_check() && position.generate_moves().is_empty()),
            ..PerftCounts::default()
        };
    }
    let mut counts = PerftCounts::default();
    for next_move in position.generate_moves() {
        let capture = is_capture(position, &next_move);
        let en_passant = is_en_passant(position, &next_move);
        let castle = is_castle(position, &next_move);
        let promotion = next_move.promotion().is_some();

        let mut next_position = position.clone();
        next_position.make_move(&next_move);

        if depth == 1 {
            counts.nodes += 1;
            counts.captures += u64::from(capture);
            counts.en_passant += u64::from(en_passant);
            counts.castles += u64::from(castle);
            counts.promotions += u64::from(promotion);
            counts.checks += u64::from(next_position.in_check());
            counts.checkmates +=
                u64::from(next_position.in_check() && next_position.generate_moves().is_empty());
        } else {
            counts = counts + advanced(&next_position, depth - 1);
        }
    }
    counts
}

/// Splits the root moves across `workers` threads, each accumulating its own
/// local node count with no shared mutable state, then sums the results
/// after joining. Grounded in `perft_threaded` from the original engine, but
/// corrected: the original had every worker thread increment one shared
/// counter by reference, a data race. Here each [`thread::spawn`] closure
/// owns a cloned position and returns its count by value.
#[must_use]
pub fn parallel(position: &Position, depth: u8, workers: usize) -> u64 {
    if depth == 0 {
        return 1;
    }
    let workers = workers.max(1);
    let root_moves: Vec<Move> = position.generate_moves().into_iter().collect();
    if root_moves.is_empty() {
        return 0;
    }
    let chunk_size = root_moves.len().div_ceil(workers).max(1);
    thread::scope(|scope| {
        root_moves
            .chunks(chunk_size)
            .map(|chunk| {
                let position = position.clone();
                let chunk = chunk.to_vec();
                scope.spawn(move || {
                    let mut nodes = 0;
                    for next_move in chunk {
                        let mut next_position = position.clone();
                        next_position.make_move(&next_move);
                        nodes += if depth == 1 {
                            1
                        } else {
                            perft(&next_position, depth - 1)
                        };
                    }
                    nodes
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().expect("perft worker panicked"))
            .sum()
    })
}
