// src/cli.rs - Command-line interface
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hand Tracker - reconstruct hand trajectories from landmark detections
#[derive(Parser, Debug)]
#[command(name = "hand_tracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Track hands through a recorded detection file and write the results
    Analyze {
        /// JSON-lines detector output, one frame per line
        #[arg(short, long)]
        input: PathBuf,

        /// Session name (defaults to the input file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Video frame rate, overriding the config
        #[arg(long)]
        fps: Option<f64>,

        /// Output directory, overriding the config
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report without writing any files
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a default config file
    InitConfig {
        /// Destination (defaults to the platform config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
