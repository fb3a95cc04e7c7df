mod archive;
mod cli;
mod config;
mod imap;
mod logging;
mod repository;
mod sync;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;

#[derive(Parser)]
#[command(version, about = "Mirror locally archived IMAP folders onto a remote account")]
struct Args {
    /// Alternative config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replicate the local archive of one account onto another account's server
    Mirror {
        source: String,
        destination: String,
        /// Restrict the run to one configured folder
        #[arg(long)]
        folder: Option<String>,
    },
    /// Try to log in with an account's configured connection settings
    Check { account: String },
    /// Compare local archive and remote folder message counts
    Stats {
        account: String,
        #[arg(long)]
        json: bool,
    },
    /// Record placeholders for remote messages that were never archived
    IgnoreHistory { account: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    logging::init();

    let args = Args::parse();
    let config = Config::load_from_file(args.config)?;

    match args.command {
        Command::Mirror {
            source,
            destination,
            folder,
        } => cli::mirror(&config, &source, &destination, folder.as_deref()).await,
        Command::Check { account } => cli::check(&config, &account).await,
        Command::Stats { account, json } => cli::stats(&config, &account, json).await,
        Command::IgnoreHistory { account } => cli::ignore_history(&config, &account).await,
    }
}
