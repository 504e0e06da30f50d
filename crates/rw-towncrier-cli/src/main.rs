//! rw-towncrier CLI - Towncrier draft changelog tools.
//!
//! Provides commands for:
//! - `fragments`: List pending changelog fragments
//! - `draft`: Render the unreleased changelog draft
//! - `render`: Expand `::towncrier-draft-entries` directives in a page
//! - `outdated`: List pages to rebuild after fragment changes
//! - `lock`: Platform-specific pip lock file helpers

mod commands;
mod error;
mod lockfile;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DraftArgs, FragmentsArgs, LockCommand, OutdatedArgs, RenderArgs};
use output::Output;

/// rw-towncrier - Towncrier draft changelog tools.
#[derive(Parser)]
#[command(name = "rw-towncrier", version, about)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pending changelog fragments.
    Fragments(FragmentsArgs),
    /// Render the unreleased changelog draft.
    Draft(DraftArgs),
    /// Expand draft-entries directives in a Markdown page.
    Render(RenderArgs),
    /// List fragment-dependent pages that need rebuilding.
    Outdated(OutdatedArgs),
    /// Pip lock file helpers.
    #[command(subcommand)]
    Lock(LockCommand),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Fragments(args) => args.execute(),
        Commands::Draft(args) => args.execute(),
        Commands::Render(args) => args.execute(),
        Commands::Outdated(args) => args.execute(),
        Commands::Lock(cmd) => cmd.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
