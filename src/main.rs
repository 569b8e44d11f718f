//! Vanilla prime checker entry point.

mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;
use vanilla::primes;
use vanilla_runtime::RuntimeResult;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Runtime error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> RuntimeResult<String> {
    let mut ctx = primes::create_context()?;
    let lower = ctx.int(cli.lower);
    let upper = ctx.int(cli.limit);
    let result = primes::find_primes_between(&mut ctx, lower, upper)?;

    if cli.render {
        return ctx.render(result);
    }

    let nums = match ctx.map_get_str(result, "nums")? {
        Some(list) => ctx.list_to_ints(list)?,
        None => Vec::new(),
    };
    Ok(nums
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", "))
}
