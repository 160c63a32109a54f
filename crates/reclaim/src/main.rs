mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "reclaim",
    version,
    about = "Find, shut down, and restart the processes locking a file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default configuration file
    Init,
    /// List the processes holding a lock on the given files
    Who {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Shut down the locking processes, then restart the survivors
    Unlock {
        /// Files to release
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Also shut down processes that never registered for restart
        #[arg(long)]
        all: bool,
        /// Leave the stopped processes stopped
        #[arg(long)]
        no_restart: bool,
    },
    /// Print decoded session-end notifications until interrupted
    Watch,
}

fn main() {
    let cli = Cli::parse();
    let config = reclaim_core::config::load();
    reclaim_core::log::init(&config.log);

    match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Who { files, json } => commands::who::execute(&files, json),
        Commands::Unlock {
            files,
            all,
            no_restart,
        } => commands::unlock::execute(&files, &config, all, no_restart),
        Commands::Watch => commands::watch::execute(&config),
    }
}
