// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! Shared utilities for the integration tests:
//!
//! - `frames`: canned Modbus TCP frames and builders
//! - `mocks`: a scriptable in-process Modbus device over real TCP
//! - `harness`: proxy harness wiring a bridge to a mock device, plus a
//!   raw TCP test client

pub mod frames;
pub mod harness;
pub mod mocks;

pub use frames::*;
pub use harness::*;
pub use mocks::*;
