mod cli;
mod commands;
mod render;

use anyhow::Context;
use clap::Parser;

fn main() {
    let parsed = cli::Cli::parse();
    if let Err(err) = run(parsed) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(parsed: cli::Cli) -> anyhow::Result<()> {
    cli::init_tracing(parsed.verbose, parsed.quiet)?;

    // the client is single-threaded and cooperative; one thread is plenty
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(commands::dispatch(parsed))
}
