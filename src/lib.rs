//! Bitboard-based chess position representation, legal move generator and
//! perft driver.

// TODO: Gradually move most of warnings to deny.
#![warn(missing_docs, variant_size_differences)]
// Rustc lints.
#![warn(
    absolute_paths_not_starting_with_crate,
    keyword_idents,
    macro_use_extern_crate,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]
// Rustdoc lints.
#![warn(
    rustdoc::missing_doc_code_examples,
    rustdoc::private_doc_tests,
    rustdoc::missing_crate_level_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_html_tags,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls
)]
// Clippy lints.
#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
// Performance is extremely important.
#![deny(clippy::perf)]

pub mod chess;
pub mod util;

shadow_rs::shadow!(build);

/// Full version of the crate, including the commit hash. Produced by
/// `build.rs` via `shadow-rs`.
pub const VERSION: &str = build::PKG_VERSION;
/// Build type and target triple. Produced by `build.rs` via `shadow-rs`.
pub const BUILD_INFO: &str = build::BUILD_RUST_CHANNEL;

/// Prints information about the host system and the build that produced this
/// binary.
pub fn print_system_info() {
    println!("pabi {VERSION} ({BUILD_INFO})");
    if cfg!(target_feature = "bmi2") {
        println!("BMI2 is supported");
    }
}
