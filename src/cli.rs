//! CLI argument parsing for davlock.
//!
//! Uses clap derive macros for declarative argument definitions. Command
//! implementations live in `main.rs`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// davlock: in-memory WebDAV server with hierarchical write locking.
///
/// Serves RFC 4918 collaborative-authoring semantics over a pluggable
/// resource store. Locks are advisory and in-memory; nothing survives a
/// restart.
#[derive(Parser, Debug)]
#[command(name = "davlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for davlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebDAV server.
    ///
    /// Without --config, built-in defaults are used (bind 127.0.0.1:4918).
    Serve(ServeArgs),

    /// Validate a configuration file and print the effective settings.
    CheckConfig(CheckConfigArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the YAML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bind address override (host:port).
    #[arg(long)]
    pub bind: Option<String>,

    /// Reject every mutating method with 403 Forbidden.
    #[arg(long)]
    pub read_only: bool,
}

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Path to the YAML configuration file.
    pub config: PathBuf,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
