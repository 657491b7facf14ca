// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use crate::cli::Cli;
use crate::error::BinResult;
use crate::logging::{init_logging, resolve_logging};
use crate::runtime::{build_config, RuntimeBuilder};

/// Executes the `run` command to start the proxy.
pub async fn run(cli: &Cli) -> BinResult<()> {
    let config = build_config(cli)?;

    let (level, format) = resolve_logging(cli, &config.logging);
    init_logging(&level, format);

    let runtime = RuntimeBuilder::new().config(config).build()?;
    runtime.run().await
}
