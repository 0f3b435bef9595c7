//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CombineCommand, LocateCommand, RegisterCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Runs registration and label pipelines through external image tools
#[derive(Debug, Parser, Clone)]
#[command(name = "labelpipe")]
#[command(author = "Labelpipe Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Runs registration and label pipelines through external image tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to runner configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Masked registration followed by label and volume resampling
    Register(RegisterCommand),

    /// Combine two label maps
    Combine(CombineCommand),

    /// Resolve tool names to executable paths
    Locate(LocateCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
