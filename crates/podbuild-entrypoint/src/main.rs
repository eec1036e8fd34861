//! podbuild-entrypoint - wraps one build step inside a pod unit.
//!
//! ```text
//! podbuild-entrypoint --wait-file /builder/tools/0 --post-file /builder/tools/1 \
//!     --entrypoint make -- release
//! ```
//!
//! Exits with the step's own code, or 125 when the runner itself fails.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use podbuild_entrypoint::{Entrypointer, FileWaiter, INTERNAL_FAULT_EXIT_CODE};
use tracing::{error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "podbuild-entrypoint")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wait for a signal file, run a step, post a signal file", long_about = None)]
struct Cli {
    /// Executable placed before the trailing arguments
    #[arg(long, env = "PODBUILD_ENTRYPOINT", default_value = "")]
    entrypoint: String,

    /// File whose existence releases this step
    #[arg(long, env = "PODBUILD_WAIT_FILE")]
    wait_file: Option<PathBuf>,

    /// File created after the step exits 0
    #[arg(long, env = "PODBUILD_POST_FILE")]
    post_file: Option<PathBuf>,

    /// Poll interval while waiting, in milliseconds
    #[arg(
        long,
        env = "PODBUILD_WAIT_POLL_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    wait_poll_interval_ms: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Step command line
    #[arg(last = true)]
    args: Vec<String>,
}

fn init_tracing(json: bool, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, cli.verbose)?;

    let entrypointer = Entrypointer::new(cli.entrypoint, cli.args)
        .with_wait_file(cli.wait_file.unwrap_or_default())
        .with_post_file(cli.post_file.unwrap_or_default())
        .with_waiter(FileWaiter::new(Duration::from_millis(cli.wait_poll_interval_ms)));

    let code = match entrypointer.go().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Step runner failed");
            eprintln!("podbuild-entrypoint: {e}");
            INTERNAL_FAULT_EXIT_CODE
        }
    };
    std::process::exit(code);
}
