use assert_cmd::Command;
use predicates::str::contains;

const BINARY_NAME: &str = "pabi";

#[test]
fn perft_starting_position() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("binary should be built");

    drop(
        cmd.args(["perft", "4"])
            .assert()
            .success()
            .stdout(contains("197281")),
    );
}

#[test]
fn perft_with_explicit_fen() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("binary should be built");

    drop(
        cmd.args([
            "perft",
            "2",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        ])
        .assert()
        .success(),
    );
}

#[test]
fn perft_rejects_invalid_fen() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("binary should be built");

    drop(cmd.args(["perft", "1", "not a fen"]).assert().failure());
}

#[test]
fn perft_divide_sums_to_total() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("binary should be built");

    drop(
        cmd.args(["perft-divide", "3"])
            .assert()
            .success()
            .stdout(contains("8902")),
    );
}

#[test]
fn perft_parallel_matches_sequential() {
    let mut cmd = Command::cargo_bin(BINARY_NAME).expect("binary should be built");

    drop(
        cmd.args(["perft-parallel", "4", "--workers", "2"])
            .assert()
            .success()
            .stdout(contains("197281")),
    );
}
