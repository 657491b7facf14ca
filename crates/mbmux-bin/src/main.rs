// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! mbmux - Modbus connection multiplexer
//!
//! Main binary entry point.

use mbmux_bin::error::report_error_and_exit;
use mbmux_bin::{commands, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}
