// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.

mod check;
mod sync;
mod validate;
mod version;

pub use check::check;
pub use sync::{purge, sync};
pub use validate::validate;
pub use version::version;

use ward_config::WardConfig;
use ward_registry::{ScopeRegistry, ScopeRegistryBuilder};

use crate::cli::{Cli, Commands, LogFormat};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Executes the command selected on the command line.
///
/// Logging is initialized here, after the configuration is read, so the
/// configured level applies when no flag overrides it.
pub fn execute(cli: Cli) -> BinResult<()> {
    if let Commands::Version = cli.command {
        init_logging(
            cli.effective_log_level("warn"),
            cli.log_format.unwrap_or_default(),
        );
        return version::version(&cli);
    }

    let config = load_config(&cli)?;
    let format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from(config.logging.format));
    init_logging(cli.effective_log_level(config.logging.level.as_str()), format);

    match cli.command.clone() {
        Commands::Validate(args) => validate::validate(&cli, &config, args),
        Commands::Check(args) => check::check(&config, args),
        Commands::Sync(args) => sync::sync(&config, args),
        Commands::Purge(args) => sync::purge(&config, args),
        Commands::Version => version::version(&cli),
    }
}

/// Reads the configuration file named on the command line.
pub fn load_config(cli: &Cli) -> BinResult<WardConfig> {
    if !cli.config.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            cli.config.display()
        )));
    }
    Ok(ward_config::load_config(&cli.config)?)
}

/// Builds the registry and loads the data tree.
pub fn open_registry(config: &WardConfig) -> BinResult<ScopeRegistry> {
    let registry = ScopeRegistryBuilder::from_config(config)?.build()?;
    registry
        .reset()
        .map_err(|e| BinError::from(e).with_context("Failed to load data tree"))?;
    Ok(registry)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;

    fn cli_for(dir: &tempfile::TempDir, args: &[&str]) -> Cli {
        let config = dir.path().join("ward.yaml");
        fs::write(
            &config,
            "data:\n  root: data\nscopes:\n  default: world\n  active: [world]\n",
        )
        .unwrap();
        let mut argv = vec!["ward", "-c", config.to_str().unwrap(), "-q"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::parse_from(["ward", "-c", "/nonexistent/ward.yaml", "sync"]);
        let err = execute(cli).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_validate_creates_templates() {
        let dir = tempfile::tempdir().unwrap();
        execute(cli_for(&dir, &["validate"])).unwrap();
        assert!(dir.path().join("data/scopes/world/groups.yml").exists());
        assert!(dir.path().join("data/GlobalGroups.yml").exists());
    }

    #[test]
    fn test_check_denied_permission() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(cli_for(&dir, &["check", "world", "steve", "fly"])).unwrap_err();
        assert!(matches!(err, BinError::PermissionDenied { .. }));
        assert_eq!(err.exit_code(), 6);

        execute(cli_for(&dir, &["check", "world", "steve"])).unwrap();
    }

    #[test]
    fn test_purge_on_fresh_tree() {
        let dir = tempfile::tempdir().unwrap();
        execute(cli_for(&dir, &["purge"])).unwrap();
        execute(cli_for(&dir, &["sync", "--force"])).unwrap();
    }
}
