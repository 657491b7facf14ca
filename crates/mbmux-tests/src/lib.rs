// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # mbmux Integration Tests
//!
//! Integration tests for the mbmux Modbus connection multiplexer, plus
//! the shared utilities they are built on.
//!
//! ## Module Structure
//!
//! - [`common`]: shared test utilities
//!   - `frames`: canned Modbus TCP frames and frame builders
//!   - `mocks`: a scriptable in-process Modbus device
//!   - `harness`: proxy harness and raw test client
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p mbmux-tests
//!
//! # Run a specific suite
//! cargo test -p mbmux-tests --test integration_proxy
//! cargo test -p mbmux-tests --test integration_gateway
//! cargo test -p mbmux-tests --test integration_isolation
//! cargo test -p mbmux-tests --test integration_config
//! ```

#![deny(unsafe_code)]

pub mod common;
