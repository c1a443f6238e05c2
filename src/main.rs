use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tickertest::cli::{self, Invocation};
use tickertest::report::Console;
use tickertest::runner::Runner;
use tickertest::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the run report; logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match cli::parse_from(std::env::args_os()) {
        Ok(Invocation::Help) => {
            print!("{}", cli::USAGE);
            return Ok(());
        }
        Ok(Invocation::Run(config)) => config,
        Err(err) => err.exit(),
    };

    // Detached work still running when this returns is cut off at exit.
    Runner::new(config, Arc::new(Console::new())).run().await?;
    Ok(())
}
