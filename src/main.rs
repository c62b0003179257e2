//! Command-line driver exercising the perft family of move generation
//! correctness/performance checks.

use clap::{Parser, Subcommand};
use pabi::chess::perft;
use pabi::chess::position::Position;

#[derive(Parser)]
#[command(name = "pabi", version = pabi::VERSION, about = "Chess move generation perft driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Counts leaf nodes at `depth` from a position (starting position by
    /// default).
    Perft {
        depth: u8,
        #[arg(default_value = None)]
        fen: Option<String>,
    },
    /// Like `perft`, but prints the leaf node count broken down by root
    /// move, useful for diffing against a reference engine.
    PerftDivide {
        depth: u8,
        #[arg(default_value = None)]
        fen: Option<String>,
    },
    /// Like `perft`, but splits root moves across worker threads.
    PerftParallel {
        depth: u8,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(default_value = None)]
        fen: Option<String>,
    },
}

fn parse_position(fen: Option<String>) -> anyhow::Result<Position> {
    match fen {
        Some(fen) => Position::try_from(fen.as_str()),
        None => Ok(Position::starting()),
    }
}

fn main() -> anyhow::Result<()> {
    pabi::print_system_info();

    let cli = Cli::parse();
    match cli.command {
        Command::Perft { depth, fen } => {
            let position = parse_position(fen)?;
            let nodes = pabi::chess::position::perft(&position, depth);
            println!("{nodes}");
        }
        Command::PerftDivide { depth, fen } => {
            let position = parse_position(fen)?;
            let mut total = 0;
            for (next_move, nodes) in perft::divide(&position, depth) {
                println!("{next_move}: {nodes}");
                total += nodes;
            }
            println!();
            println!("{total}");
        }
        Command::PerftParallel { depth, workers, fen } => {
            let position = parse_position(fen)?;
            let workers = workers.unwrap_or_else(|| {
                std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
            });
            let nodes = perft::parallel(&position, depth, workers);
            println!("{nodes}");
        }
    }
    Ok(())
}
