//! RTS CLI - rts command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

/// RTS - Run a command when folders change
#[derive(Parser)]
#[command(name = "rts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write logs to rts.log in this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// More detailed logging (default level: warn)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor folders and run a command once changes settle
    Run {
        /// Configuration file (default: <config dir>/rts/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Folder to monitor (repeatable, adds to the configured folders)
        #[arg(short, long = "dir")]
        dirs: Vec<String>,

        /// Seconds without changes before the command runs
        #[arg(long)]
        delay: Option<u64>,

        /// Command line to run
        #[arg(long)]
        command: Option<String>,
    },
    /// Show how folder phrases resolve
    Resolve {
        /// Folder phrases (macros, ~ and [volume] prefixes allowed)
        #[arg(required = true)]
        phrases: Vec<String>,
    },
    /// Count files and folders below a folder
    Scan {
        /// Folder phrase
        dir: String,

        /// Descend into symbolic links
        #[arg(long)]
        follow_symlinks: bool,
    },
    /// Show or create the configuration file
    Config {
        /// Configuration file to show
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the default config file path
        #[arg(long, conflicts_with = "example")]
        path: bool,

        /// Create the default config file if missing (with --path)
        #[arg(long, requires = "path")]
        create: bool,

        /// Print an example configuration
        #[arg(long)]
        example: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _guard = cli_lib::logging::init(cli.log_dir.as_deref(), level)?;

    match cli.command {
        Commands::Run {
            config,
            dirs,
            delay,
            command,
        } => cmd::run::run(config, dirs, delay, command).await,
        Commands::Resolve { phrases } => cmd::resolve::run(&phrases).await,
        Commands::Scan {
            dir,
            follow_symlinks,
        } => cmd::scan::run(&dir, follow_symlinks).await,
        Commands::Config {
            config,
            path,
            create,
            example,
        } => {
            if example {
                cmd::config::run_example().await
            } else if path {
                cmd::config::run_path(create).await
            } else {
                cmd::config::run_show(config.as_deref()).await
            }
        }
    }
}
