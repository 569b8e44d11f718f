//! Command-line interface for the Vanilla prime checker.

use clap::Parser;

#[derive(Parser)]
#[command(name = "vanilla")]
#[command(about = "Run the Vanilla prime checker sample", long_about = None)]
pub struct Cli {
    /// Upper bound of the search, inclusive
    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    pub limit: i64,

    /// Lower bound of the search, inclusive
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub lower: i64,

    /// Print the whole result map instead of the list of primes
    #[arg(long)]
    pub render: bool,

    /// Enable debug logging unless RUST_LOG says otherwise
    #[arg(short, long)]
    pub verbose: bool,
}
