// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints version information for every ward crate.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("ward - per-scope hierarchical permission store");
    println!();
    println!("Version Information:");
    println!("  ward-bin:      {}", env!("CARGO_PKG_VERSION"));
    println!("  ward-core:     {}", ward_core::VERSION);
    println!("  ward-config:   {}", ward_config::VERSION);
    println!("  ward-store:    {}", ward_store::VERSION);
    println!("  ward-registry: {}", ward_registry::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:        {}", std::env::consts::ARCH);
    println!("  OS:            {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
