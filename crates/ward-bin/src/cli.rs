// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `validate`: load the configuration and every scope, report problems
//! - `check`: show a user's effective permissions in a scope
//! - `sync`: run one save pass
//! - `purge`: drop expired entries, then save
//! - `version`: show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// ward - per-scope hierarchical permission store
///
/// Operates on a ward data tree: group and user documents per scope plus
/// the global groups document.
#[derive(Parser, Debug)]
#[command(
    name = "ward",
    author = "Sylvex <contact@sylvex.io>",
    version = ward_core::VERSION,
    about = "Per-scope hierarchical permission store",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "ward.yaml",
        env = "WARD_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "WARD_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json, compact)
    #[arg(long, env = "WARD_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Validate the configuration and the data tree
    ///
    /// Loads every scope the way a running process would and reports the
    /// scopes, their mirrors and any load warnings.
    Validate(ValidateArgs),

    /// Show a user's effective permissions
    ///
    /// With a permission argument, exits non-zero when it is not granted.
    Check(CheckArgs),

    /// Run one save pass
    ///
    /// Writes changed tables and reloads tables whose files are newer.
    Sync(SyncArgs),

    /// Remove expired permissions and sub-groups, then save
    Purge(SyncArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Scope name; unknown scopes fall back like lookups do
    pub scope: String,

    /// User id
    pub user: String,

    /// Permission to test
    pub permission: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `sync` and `purge` commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Overwrite files that are newer than the loaded data
    #[arg(long)]
    pub force: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<ward_config::LogFormat> for LogFormat {
    fn from(format: ward_config::LogFormat) -> Self {
        match format {
            ward_config::LogFormat::Text => LogFormat::Text,
            ward_config::LogFormat::Json => LogFormat::Json,
            ward_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the log level: flags first, then the explicit level, then
    /// `fallback` (usually the configured level).
    pub fn effective_log_level<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            self.log_level.as_deref().unwrap_or(fallback)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
