//! Attack generation: for each piece kind, the set of squares it attacks from
//! a given square (and, for sliding pieces, a given board occupancy), plus
//! [`AttackInfo`] which bundles together everything [`super::position`] needs
//! to know about the opponent's attacks to generate legal moves: checkers,
//! pins, safe king squares and the full set of attacked squares.
//!
//! Sliding attacks are computed by walking each relevant direction from the
//! source square until hitting a blocker or the board edge (ray iteration),
//! rather than via precomputed magic/PEXT tables: see the knight/king/pawn
//! attacks below for the simpler leaper patterns, which are cheap to compute
//! directly and don't need a table either.

use crate::chess::bitboard::{Bitboard, Pieces};
use crate::chess::core::{Direction, Player, Square};

const ROOK_DIRECTIONS: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
const BISHOP_DIRECTIONS: [Direction; 4] = [
    Direction::UpLeft,
    Direction::UpRight,
    Direction::DownLeft,
    Direction::DownRight,
];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

fn sliding_attacks(square: Square, occupancy: Bitboard, directions: &[Direction]) -> Bitboard {
    let mut result = Bitboard::empty();
    for &direction in directions {
        let mut current = square;
        while let Some(next) = current.shift(direction) {
            result.extend(next);
            if occupancy.contains(next) {
                break;
            }
            current = next;
        }
    }
    result
}

/// Squares a rook on `square` attacks given `occupancy`, including the first
/// blocker in each direction (friendly or not: callers are expected to mask
/// out friendly-occupied squares separately, per the generator's contract).
#[must_use]
pub(super) fn rook_attacks(square: Square, occupancy: Bitboard) -> Bitboard {
    sliding_attacks(square, occupancy, &ROOK_DIRECTIONS)
}

/// Squares a bishop on `square` attacks given `occupancy`.
#[must_use]
pub(super) fn bishop_attacks(square: Square, occupancy: Bitboard) -> Bitboard {
    sliding_attacks(square, occupancy, &BISHOP_DIRECTIONS)
}

/// Squares a queen on `square` attacks given `occupancy`: the union of rook
/// and bishop attacks.
#[must_use]
pub(super) fn queen_attacks(square: Square, occupancy: Bitboard) -> Bitboard {
    rook_attacks(square, occupancy) | bishop_attacks(square, occupancy)
}

/// Squares a knight on `square` attacks. Knight moves never depend on
/// occupancy.
#[must_use]
pub(super) fn knight_attacks(square: Square) -> Bitboard {
    let (file, rank) = (square.file() as i8, square.rank() as i8);
    let mut result = Bitboard::empty();
    for (df, dr) in KNIGHT_OFFSETS {
        let (new_file, new_rank) = (file + df, rank + dr);
        if (0..8).contains(&new_file) && (0..8).contains(&new_rank) {
            result.extend(Square::new(
                new_file.try_into().expect("checked range"),
                new_rank.try_into().expect("checked range"),
            ));
        }
    }
    result
}

/// Squares a king on `square` attacks (disregarding castling).
#[must_use]
pub(super) fn king_attacks(square: Square) -> Bitboard {
    let mut result = Bitboard::empty();
    for direction in [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ] {
        if let Some(target) = square.shift(direction) {
            result.extend(target);
        }
    }
    result
}

/// Squares a `player`'s pawn standing on `square` attacks (diagonal captures
/// only, no pushes).
#[must_use]
pub(super) fn pawn_attacks(square: Square, player: Player) -> Bitboard {
    let directions = match player {
        Player::White => [Direction::UpLeft, Direction::UpRight],
        Player::Black => [Direction::DownLeft, Direction::DownRight],
    };
    let mut result = Bitboard::empty();
    for direction in directions {
        if let Some(target) = square.shift(direction) {
            result.extend(target);
        }
    }
    result
}

fn direction_between(from: Square, to: Square) -> Option<Direction> {
    let (df, dr) = (
        to.file() as i8 - from.file() as i8,
        to.rank() as i8 - from.rank() as i8,
    );
    if df == 0 && dr == 0 {
        return None;
    }
    if df != 0 && dr != 0 && df.abs() != dr.abs() {
        return None;
    }
    let (sf, sr) = (df.signum(), dr.signum());
    Some(match (sf, sr) {
        (0, 1) => Direction::Up,
        (0, -1) => Direction::Down,
        (1, 0) => Direction::Right,
        (-1, 0) => Direction::Left,
        (1, 1) => Direction::UpRight,
        (-1, 1) => Direction::UpLeft,
        (1, -1) => Direction::DownRight,
        (-1, -1) => Direction::DownLeft,
        _ => unreachable!("signum only produces -1, 0, 1"),
    })
}

const fn is_orthogonal(direction: Direction) -> bool {
    matches!(
        direction,
        Direction::Up | Direction::Down | Direction::Left | Direction::Right
    )
}

fn directed_ray(from: Square, to: Square, direction: Direction) -> Bitboard {
    let mut result = Bitboard::empty();
    let mut current = from;
    while current != to {
        result.extend(current);
        match current.shift(direction) {
            Some(next) => current = next,
            None => break,
        }
    }
    result
}

/// Squares on the line from `from` to `to` (rank, file or diagonal),
/// including `from` and excluding `to`. Empty if the two squares aren't
/// aligned. Used both to find the squares that block a check (`ray(checker,
/// king)`) and to test whether a pinned piece's destination keeps it on the
/// pinning line (`ray(from, king) & ray(to, king)`).
#[must_use]
pub(super) fn ray(from: Square, to: Square) -> Bitboard {
    match direction_between(from, to) {
        Some(direction) => directed_ray(from, to, direction),
        None => Bitboard::empty(),
    }
}

/// Like [`ray`], but only returns a non-empty result when `from` and `to`
/// are diagonally aligned.
#[must_use]
pub(super) fn bishop_ray(from: Square, to: Square) -> Bitboard {
    match direction_between(from, to) {
        Some(direction) if !is_orthogonal(direction) => directed_ray(from, to, direction),
        _ => Bitboard::empty(),
    }
}

/// Squares strictly between `attacker` and `king` (excluding both), along the
/// direction the attacker's piece kind is capable of moving.
fn pin_ray(king: Square, attacker: Square, orthogonal: bool) -> Bitboard {
    match direction_between(attacker, king) {
        Some(direction) if is_orthogonal(direction) == orthogonal => {
            directed_ray(attacker, king, direction) - Bitboard::from(attacker)
        }
        _ => Bitboard::empty(),
    }
}

#[allow(non_upper_case_globals)]
mod squares {
    pub(super) use crate::chess::core::Square::{A8, B1, B8, C1, C8, D1, D8, F1, F8, G1, G8, H1, H8};
}

/// Squares the white king walks through (and must not be attacked on) while
/// castling short, i.e. O-O.
pub(super) const WHITE_SHORT_CASTLE_KING_WALK: Bitboard =
    Bitboard::from_bits(square_mask(squares::F1) | square_mask(squares::G1));
/// Squares that must be empty for white's rook to reach its short-castle
/// destination.
pub(super) const WHITE_SHORT_CASTLE_ROOK_WALK: Bitboard = Bitboard::from_bits(square_mask(squares::F1));
/// Squares the white king walks through while castling long, i.e. O-O-O.
pub(super) const WHITE_LONG_CASTLE_KING_WALK: Bitboard =
    Bitboard::from_bits(square_mask(squares::C1) | square_mask(squares::D1));
/// Squares that must be empty for white's rook to reach its long-castle
/// destination.
pub(super) const WHITE_LONG_CASTLE_ROOK_WALK: Bitboard =
    Bitboard::from_bits(square_mask(squares::B1) | square_mask(squares::C1) | square_mask(squares::D1));
/// Squares the black king walks through while castling short.
pub(super) const BLACK_SHORT_CASTLE_KING_WALK: Bitboard =
    Bitboard::from_bits(square_mask(squares::F8) | square_mask(squares::G8));
/// Squares that must be empty for black's rook to reach its short-castle
/// destination.
pub(super) const BLACK_SHORT_CASTLE_ROOK_WALK: Bitboard = Bitboard::from_bits(square_mask(squares::F8));
/// Squares the black king walks through while castling long.
pub(super) const BLACK_LONG_CASTLE_KING_WALK: Bitboard =
    Bitboard::from_bits(square_mask(squares::C8) | square_mask(squares::D8));
/// Squares that must be empty for black's rook to reach its long-castle
/// destination.
pub(super) const BLACK_LONG_CASTLE_ROOK_WALK: Bitboard =
    Bitboard::from_bits(square_mask(squares::B8) | square_mask(squares::C8) | square_mask(squares::D8));

const fn square_mask(square: Square) -> u64 {
    1u64 << square as u8
}

/// Everything [`super::position::Position::generate_moves`] needs to know
/// about the opponent's attacks against the side to move: which squares
/// check the king, which of our pieces are pinned (and thus restricted to
/// their pinning ray), which squares the king may safely step to, and the
/// full set of squares the opponent attacks (used for castling legality).
pub(in crate::chess) struct AttackInfo {
    pub(in crate::chess) checkers: Bitboard,
    pub(in crate::chess) pins: Bitboard,
    pub(in crate::chess) safe_king_squares: Bitboard,
    pub(in crate::chess) attacks: Bitboard,
}

impl AttackInfo {
    /// Computes full attack information against `king` (belonging to the
    /// side to move), given the opponent (`them`) pieces and the occupancy
    /// of both sides.
    #[must_use]
    pub(in crate::chess) fn new(
        them: Player,
        their_pieces: &Pieces,
        king: Square,
        our_occupancy: Bitboard,
        occupancy: Bitboard,
    ) -> Self {
        let us = !them;

        let mut checkers = Bitboard::empty();
        checkers |= knight_attacks(king) & their_pieces.knights;
        checkers |= pawn_attacks(king, us) & their_pieces.pawns;
        checkers |= rook_attacks(king, occupancy) & (their_pieces.rooks | their_pieces.queens);
        checkers |= bishop_attacks(king, occupancy) & (their_pieces.bishops | their_pieces.queens);

        let mut pins = Bitboard::empty();
        for attacker in (their_pieces.rooks | their_pieces.queens).iter() {
            let between = pin_ray(king, attacker, true);
            let blockers = between & occupancy;
            if blockers.count() == 1 && (blockers & our_occupancy).has_any() {
                pins |= blockers;
            }
        }
        for attacker in (their_pieces.bishops | their_pieces.queens).iter() {
            let between = pin_ray(king, attacker, false);
            let blockers = between & occupancy;
            if blockers.count() == 1 && (blockers & our_occupancy).has_any() {
                pins |= blockers;
            }
        }

        // Slider attacks are computed with our king removed from the
        // occupancy, so the king can't "hide" by stepping straight back
        // along the ray it's being checked on.
        let occupancy_without_king = occupancy - Bitboard::from(king);
        let mut attacks = Bitboard::empty();
        for square in their_pieces.knights.iter() {
            attacks |= knight_attacks(square);
        }
        for square in their_pieces.king.iter() {
            attacks |= king_attacks(square);
        }
        for square in their_pieces.pawns.iter() {
            attacks |= pawn_attacks(square, them);
        }
        for square in (their_pieces.rooks | their_pieces.queens).iter() {
            attacks |= rook_attacks(square, occupancy_without_king);
        }
        for square in (their_pieces.bishops | their_pieces.queens).iter() {
            attacks |= bishop_attacks(square, occupancy_without_king);
        }

        let safe_king_squares = king_attacks(king) & !our_occupancy & !attacks;

        Self {
            checkers,
            pins,
            safe_king_squares,
            attacks,
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, ray, rook_attacks};
    use crate::chess::bitboard::Bitboard;
    use crate::chess::core::{Player, Square};

    #[test]
    fn rook_attacks_open_board() {
        let attacks = rook_attacks(Square::D4, Bitboard::empty());
        assert_eq!(attacks.count(), 14);
        assert!(attacks.contains(Square::D1));
        assert!(attacks.contains(Square::D8));
        assert!(attacks.contains(Square::A4));
        assert!(attacks.contains(Square::H4));
    }

    #[test]
    fn rook_attacks_blocked() {
        let mut occupancy = Bitboard::empty();
        occupancy.extend(Square::D6);
        occupancy.extend(Square::F4);
        let attacks = rook_attacks(Square::D4, occupancy);
        assert!(attacks.contains(Square::D6));
        assert!(!attacks.contains(Square::D7));
        assert!(attacks.contains(Square::F4));
        assert!(!attacks.contains(Square::G4));
    }

    #[test]
    fn bishop_attacks_open_board() {
        let attacks = bishop_attacks(Square::D4, Bitboard::empty());
        assert!(attacks.contains(Square::A1));
        assert!(attacks.contains(Square::G7));
        assert!(attacks.contains(Square::A7));
        assert!(attacks.contains(Square::G1));
    }

    #[test]
    fn knight_attacks_center_and_corner() {
        assert_eq!(knight_attacks(Square::D4).count(), 8);
        assert_eq!(knight_attacks(Square::A1).count(), 2);
    }

    #[test]
    fn king_attacks_corner() {
        assert_eq!(king_attacks(Square::A1).count(), 3);
        assert_eq!(king_attacks(Square::D4).count(), 8);
    }

    #[test]
    fn pawn_attacks_by_color() {
        let white = pawn_attacks(Square::D4, Player::White);
        assert!(white.contains(Square::C5));
        assert!(white.contains(Square::E5));
        let black = pawn_attacks(Square::D4, Player::Black);
        assert!(black.contains(Square::C3));
        assert!(black.contains(Square::E3));
    }

    #[test]
    fn ray_between_aligned_squares() {
        let between = ray(Square::A1, Square::A8);
        assert_eq!(between.count(), 7);
        assert!(between.contains(Square::A1));
        assert!(!between.contains(Square::A8));
    }

    #[test]
    fn ray_unaligned_is_empty() {
        assert!(ray(Square::A1, Square::B3).is_empty());
    }
}
