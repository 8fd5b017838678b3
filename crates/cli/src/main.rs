//! fwatch CLI - fwd command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

/// fwatch - Reliable file change feed between a producer and a consumer
#[derive(Parser)]
#[command(name = "fwd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/fwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the producer: watch projects and deliver change batches
    Watch {
        /// Consumer base URL
        #[arg(long)]
        server: Option<String>,
        /// Directory for the snapshot database
        #[arg(long)]
        state_dir: Option<PathBuf>,
    },
    /// Run the consumer server
    Serve {
        /// Listen address, e.g. 127.0.0.1:9090
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show the consumer's watch-list
    List {
        /// Consumer base URL
        #[arg(long)]
        server: Option<String>,
    },
    /// Register or remove projects on a consumer
    #[command(subcommand)]
    Project(ProjectCommands),
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Register a project (or update its filters)
    Add {
        /// Project ID
        id: String,
        /// Root directory to watch
        root: String,
        /// Ignored path glob, relative to the root (repeatable)
        #[arg(long = "ignore-path")]
        ignore_paths: Vec<String>,
        /// Ignored file name glob (repeatable)
        #[arg(long = "ignore-filename")]
        ignore_filenames: Vec<String>,
        /// Consumer base URL
        #[arg(long)]
        server: Option<String>,
    },
    /// Stop watching a project
    Remove {
        /// Project ID
        id: String,
        /// Consumer base URL
        #[arg(long)]
        server: Option<String>,
    },
    /// Show a project's watch state
    Status {
        /// Project ID
        id: String,
        /// Consumer base URL
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli_lib::config::load(cli.config.as_deref())?;

    // Held until exit so the log file is flushed
    let _log_guard = cli_lib::logging::init(&config.log)?;

    match cli.command {
        Commands::Watch { server, state_dir } => cmd::watch::run(&config, server, state_dir).await,
        Commands::Serve { bind } => cmd::serve::run(&config, bind).await,
        Commands::List { server } => cmd::list::run(&config, server).await,
        Commands::Project(project_cmd) => match project_cmd {
            ProjectCommands::Add { id, root, ignore_paths, ignore_filenames, server } => {
                cmd::project::add(&config, server, &id, &root, ignore_paths, ignore_filenames).await
            }
            ProjectCommands::Remove { id, server } => cmd::project::remove(&config, server, &id).await,
            ProjectCommands::Status { id, server } => cmd::project::status(&config, server, &id).await,
        },
    }
}
