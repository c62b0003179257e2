//! Generates the Zobrist key tables used by [`crate::chess::zobrist`] and
//! records build/version information via `shadow-rs`.

fn generate_file(filename: &str, contents: &str) {
    let out_dir = std::env::var_os("OUT_DIR").unwrap();
    let dest_path = std::path::Path::new(&out_dir).join(filename);
    std::fs::write(dest_path, contents).unwrap();
}

/// Generates one random key per (player, piece kind, square) combination,
/// flattened into the single array `generated::get_piece_key` indexes into,
/// plus one key per en passant file.
fn generate_zobrist_keys() {
    let mut rng = rand::thread_rng();

    const NUM_PLAYERS: usize = 2;
    const NUM_PIECE_KINDS: usize = 6;
    const BOARD_SIZE: usize = 64;
    let piece_keys: [u64; NUM_PLAYERS * NUM_PIECE_KINDS * BOARD_SIZE] =
        std::array::from_fn(|_| rand::Rng::gen(&mut rng));
    generate_file("pieces_zobrist_keys", &format!("{piece_keys:?}"));

    let en_passant_keys: [u64; 8] = std::array::from_fn(|_| rand::Rng::gen(&mut rng));
    generate_file("en_passant_zobrist_keys", &format!("{en_passant_keys:?}"));
}

fn main() -> shadow_rs::SdResult<()> {
    generate_zobrist_keys();
    shadow_rs::new()
}
