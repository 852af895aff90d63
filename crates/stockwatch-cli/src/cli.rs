//! CLI argument definitions for stockwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Poll forever (default) |
//! | `once` | Run a single poll cycle and exit |
//! | `check` | Print current quotes as JSON without touching alert state |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--log-level` | `info` | Filter used when `RUST_LOG` is unset |
//! | `--log-only` | `false` | Log notifications instead of showing them |
//!
//! # Examples
//!
//! ```bash
//! # Watch the rules in ./watch
//! stockwatch ./watch
//!
//! # One cycle with debug logging
//! stockwatch ./watch --log-level debug once
//!
//! # See what the providers return right now
//! stockwatch ./watch check --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Stock price alert notifier.
///
/// Reads `stocks.json` from DIR, polls quote providers and raises a desktop
/// notification when a price crosses its threshold.
#[derive(Debug, Parser)]
#[command(name = "stockwatch", author, version, about = "Stock price alert notifier")]
pub struct Cli {
    /// Directory holding `stocks.json` and the settings and state files.
    pub dir: PathBuf,

    /// Log filter used when `RUST_LOG` is not set (e.g. `debug`, `stockwatch_core=trace`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Write notifications to the log instead of the desktop.
    #[arg(long, global = true, default_value_t = false)]
    pub log_only: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available CLI commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Poll until interrupted.
    Run,

    /// Run one poll cycle, then exit.
    Once,

    /// Resolve every watched symbol once and print the results as JSON.
    ///
    /// No alerts are evaluated and no state is written.
    Check(CheckArgs),
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Pretty-print JSON output with indentation.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
