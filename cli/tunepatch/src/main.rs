//! tunepatch — apply tuner output to a tunable values file.
//!
//! Paste the final `name,value` lines printed by a tuning run, end with an
//! empty line, and the matching `TUNABLE_VALUE(...)` declarations are updated
//! in place.

mod commands;
mod manifest;

use std::io::{self, IsTerminal};
use std::process;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "tunepatch", version, about = "Apply tuner output to a tunable values file")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read `name,value` records from stdin and patch the tunables file (default)
    Apply {
        /// Compute and report the changes without writing the file
        #[arg(long)]
        dry_run: bool,
        /// Report format (human, json)
        #[arg(long)]
        report: Option<String>,
    },
    /// List the declarations in the tunables file
    List {
        /// Output format (text, json)
        #[arg(long)]
        export: Option<String>,
    },
    /// Write a tunepatch.toml template in the current directory
    Init,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let command = cli.command.unwrap_or(Commands::Apply {
        dry_run: false,
        report: None,
    });

    match command {
        Commands::Apply { dry_run, report } => {
            let (manifest, project_dir) = manifest::load_or_default(&cwd)?;
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!("Paste tuner output (name,value per line), then an empty line:");
            }
            commands::apply::run(
                &project_dir,
                &manifest,
                stdin.lock(),
                dry_run,
                report.as_deref(),
            )?;
            Ok(())
        }

        Commands::List { export } => {
            let (manifest, project_dir) = manifest::load_or_default(&cwd)?;
            commands::list::run(&project_dir, &manifest, export.as_deref())
        }

        Commands::Init => commands::init::run(&cwd),
    }
}
