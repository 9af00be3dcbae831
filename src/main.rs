use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod models;
mod output;
mod scoring;
mod session;
mod shuffle;
mod store;
mod ui;

use crate::config::{CompletionPolicy, Config};
use crate::session::ReviewSession;

/// Per-reviewer grading tool for generated exam questions: score three
/// anonymized model variants per sample, with resumable progress and export
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file (defaults apply without one)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the per-reviewer data files (overrides the config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Completion policy: strict or lenient (overrides the config)
    #[arg(long)]
    policy: Option<CompletionPolicy>,

    /// Verbose output - show save and load progress
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start (or resume) an interactive review session
    Review {
        /// Reviewer id selecting the batch file; prompted for when omitted
        reviewer: Option<String>,
    },
    /// Show per-sample completion for a reviewer's batch
    Status {
        /// Reviewer id selecting the batch file
        reviewer: String,
    },
    /// Write a timestamped export of a reviewer's merged results
    Export {
        /// Reviewer id selecting the batch file
        reviewer: String,

        /// Directory for the export file (defaults to the data directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }

    match args.command {
        Command::Review { reviewer } => ui::run(config, reviewer, args.verbose),
        Command::Status { reviewer } => {
            let session = ReviewSession::open(config, &reviewer)?;
            output::print_progress(session.len(), session.completed_count());
            output::print_status(session.samples(), session.scores(), session.config());
            Ok(())
        }
        Command::Export { reviewer, out_dir } => {
            let session = ReviewSession::open(config, &reviewer)?;
            let path = session.export(out_dir.as_deref())?;
            if args.verbose {
                println!(
                    "Merged {} samples for reviewer {}",
                    session.len(),
                    session.reviewer_id()
                );
            }
            println!("Exported to {}", path.display());
            Ok(())
        }
    }
}
