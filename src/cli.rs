// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bridgekeeper")]
#[command(about = "Keeps a reverse-proxy container attached to every network with routable workloads")]
#[command(version)]
pub struct Cli {
    /// Path to the config file (default: bridgekeeper.yml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Container to manage, by name or ID
    #[arg(long, global = true, env = "BRIDGEKEEPER_CONTAINER")]
    pub container: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print reports as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch container events and keep network membership reconciled
    Run,

    /// Run a single reconciliation pass and exit
    Scan,

    /// Show what a pass would join and leave without changing anything
    Plan,

    /// Write a bridgekeeper.yml template in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
