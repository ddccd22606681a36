// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! ward - per-scope hierarchical permission store
//!
//! Operator binary entry point.

use ward_bin::{commands, error::report_error_and_exit, Cli};

fn main() {
    let cli = Cli::parse_args();
    if let Err(e) = commands::execute(cli) {
        report_error_and_exit(e);
    }
}
