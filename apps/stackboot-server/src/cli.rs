use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Bootstrap a stack identity, then exit or serve the user API.
#[derive(Parser, Debug)]
#[command(name = "stackboot-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Stack identity to run as; overrides the identity environment variable
    #[arg(long, value_name = "ID")]
    pub whoami: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the bootstraps of the current identity (default)
    Run,
    /// Print every registered stack identity
    List,
    /// Validate the configuration and the stack registry
    Check,
}

impl Cli {
    /// The requested command, [`Command::Run`] when none is given.
    #[must_use]
    pub fn action(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}
