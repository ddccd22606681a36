// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `check` command.

use ward_config::WardConfig;

use crate::cli::{CheckArgs, OutputFormat};
use crate::commands::open_registry;
use crate::error::{BinError, BinResult};

/// Prints the effective permissions of a user.
///
/// With a permission argument, fails with [`BinError::PermissionDenied`]
/// unless the permission is granted.
pub fn check(config: &WardConfig, args: CheckArgs) -> BinResult<()> {
    let registry = open_registry(config)?;
    let resolved_scope = registry
        .resolve_scope(&args.scope)
        .map(|data| data.name().to_string())
        .unwrap_or_else(|| args.scope.clone());
    let effective = registry.resolve_permissions(&args.scope, &args.user)?;

    match args.format {
        OutputFormat::Text => {
            println!("User:  {}", args.user);
            println!("Scope: {} (resolved as {})", args.scope, resolved_scope);
            println!();
            println!("Groups:");
            for group in effective.groups() {
                println!("  {}", group);
            }
            println!("Permissions:");
            for text in effective.texts() {
                println!("  {}", text);
            }
            if !effective.diagnostics().is_empty() {
                println!();
                println!("Warnings:");
                for diagnostic in effective.diagnostics() {
                    println!("  ⚠ {}", diagnostic);
                }
            }
            if let Some(permission) = &args.permission {
                println!();
                let verdict = match effective.check(permission) {
                    Some(true) => "granted",
                    Some(false) => "denied",
                    None => "not set",
                };
                println!("{}: {}", permission, verdict);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "user": args.user,
                "scope": args.scope,
                "resolved_scope": resolved_scope,
                "groups": effective.groups().iter().map(ToString::to_string).collect::<Vec<_>>(),
                "permissions": effective.texts(),
                "warnings": effective
                    .diagnostics()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
                "check": args.permission.as_ref().map(|p| serde_json::json!({
                    "permission": p,
                    "granted": effective.has(p),
                })),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        }
    }

    let Some(permission) = args.permission else {
        return Ok(());
    };
    if effective.has(&permission) {
        return Ok(());
    }
    Err(BinError::PermissionDenied {
        scope: resolved_scope,
        user: args.user,
        permission,
    })
}
