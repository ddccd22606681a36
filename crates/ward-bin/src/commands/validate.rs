// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use ward_config::WardConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::commands::open_registry;
use crate::error::{BinError, BinResult};

/// Loads the configuration and every scope, then reports what was found.
pub fn validate(cli: &Cli, config: &WardConfig, args: ValidateArgs) -> BinResult<()> {
    let registry = open_registry(config)?;
    // a second pass collects the per-document warnings
    let reports = registry.reload_all()?;

    let warnings: Vec<String> = reports
        .iter()
        .flat_map(|report| {
            report
                .warnings()
                .iter()
                .map(move |w| format!("{}: {}", report.path().display(), w))
        })
        .collect();

    let scopes: Vec<(String, String)> = registry
        .scope_names()
        .into_iter()
        .map(|name| {
            let mode = match (
                registry.has_groups_mirror(&name),
                registry.has_users_mirror(&name),
            ) {
                (true, true) => "full mirror",
                (true, false) => "groups mirrored",
                (false, true) => "users mirrored",
                (false, false) => "own data",
            };
            (name, mode.to_string())
        })
        .collect();

    match args.format {
        OutputFormat::Text => {
            println!("✓ Data tree is valid: {}", cli.config.display());
            println!();
            println!("Summary:");
            println!("  Scopes root:   {}", config.data.scopes_path().display());
            println!("  Default scope: {}", registry.default_scope_name());
            println!("  Global groups: {}", registry.global().read().len());
            println!();
            println!("Scopes:");
            for (name, mode) in &scopes {
                println!("  {:<24} {}", name, mode);
            }

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": cli.config.display().to_string(),
                "default_scope": registry.default_scope_name(),
                "global_groups": registry.global().read().len(),
                "scopes": scopes
                    .iter()
                    .map(|(name, mode)| serde_json::json!({ "name": name, "mode": mode }))
                    .collect::<Vec<_>>(),
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}
