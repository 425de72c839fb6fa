//! monkey binary
//!
//! Branch swing on bucket trees and give key@value formatted bananas to store.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use monkey::args::Resolver;
use monkey::{Command, ExploreConfig, Layout, MonkeyError};
use tracing_subscriber::{fmt, EnvFilter};

/// monkey
#[derive(Parser, Debug)]
#[command(name = "monkey")]
#[command(about = "branch swing on bucket trees and give key@value formatted bananas to store")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    /// Store files to explore
    #[arg(value_name = "file.bbolt")]
    paths: Vec<PathBuf>,

    /// Change tree view to not show leaves
    #[arg(short, long)]
    count: bool,

    /// Change tree view to colon separated path
    #[arg(short = 'p', long = "altPrint")]
    alt_print: bool,

    /// Rendering workers per store
    #[arg(short, long, default_value = "2")]
    workers: usize,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save bananas with key@value format. Use single quotes in each token separately to handle spaces
    ///
    /// Every argument except an optional trailing file.bbolt must be a key@value pair;
    /// any unpaired argument, wherever it appears, rejects the whole request.
    #[command(visible_alias = "hold")]
    Grasp {
        /// <key1@value1> <key2@'value 2 with spaces'> ... [file.bbolt]
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Show bananas for separate key arguments
    #[command(visible_alias = "show")]
    Deliver {
        /// <key1> <key2> ... [file.bbolt]
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Delete bananas by key
    #[command(visible_alias = "throw")]
    Hurl {
        /// <key1> <key2> ... [file.bbolt]
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        words: Vec<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing/logging; stdout is reserved for output
    let default_filter = if args.verbose { "warn,monkey=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("monkey v{}", monkey::VERSION);

    let command = match args.command {
        Some(Commands::Grasp { words }) => Command::Grasp { words },
        Some(Commands::Deliver { words }) => Command::Deliver { words },
        Some(Commands::Hurl { words }) => Command::Hurl { words },
        None => {
            let layout = if args.alt_print { Layout::Path } else { Layout::Tree };
            let config = ExploreConfig::builder()
                .layout(layout)
                .count_only(args.count)
                .workers(args.workers)
                .highlight(console::colors_enabled())
                .build();
            Command::Explore {
                paths: args.paths,
                config,
            }
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command.execute(&Resolver::new(), &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(error: &MonkeyError) -> ExitCode {
    eprintln!("error: {}", error);
    ExitCode::from(error.exit_code() as u8)
}
