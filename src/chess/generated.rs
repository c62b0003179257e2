//! Zobrist key tables generated at build time by `build.rs`.

use crate::chess::core::{Piece, Square, BOARD_SIZE};
use crate::chess::zobrist::Key;

/// Key XORed into the hash whenever it's black's turn to move.
pub(super) const BLACK_TO_MOVE: Key = 0x9E06_BAD3_9D76_1293;

pub(super) const WHITE_CAN_CASTLE_SHORT: Key = 0xF05A_C573_DD61_D323;
pub(super) const WHITE_CAN_CASTLE_LONG: Key = 0x41D8_B55B_A5FE_B78B;

pub(super) const BLACK_CAN_CASTLE_SHORT: Key = 0x6809_8878_7A43_D289;
pub(super) const BLACK_CAN_CASTLE_LONG: Key = 0x2F94_1F8D_FD3E_3D1F;

// NOTE: the following keys are randomly generated in build.rs and are not
// stable even between different builds of the same version.
pub(super) const EN_PASSANT_FILES: [Key; 8] =
    include!(concat!(env!("OUT_DIR"), "/en_passant_zobrist_keys"));

const PIECES_ZOBRIST_KEYS: [Key; 768] = include!(concat!(env!("OUT_DIR"), "/pieces_zobrist_keys"));

pub(super) fn get_piece_key(piece: Piece, square: Square) -> Key {
    const NUM_PIECE_KINDS: usize = 6;
    PIECES_ZOBRIST_KEYS[piece.player as usize * NUM_PIECE_KINDS * BOARD_SIZE as usize
        + piece.kind as usize * BOARD_SIZE as usize
        + square as usize]
}
