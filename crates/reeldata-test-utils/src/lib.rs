// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Reeldata integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - temp SQLite database with an initialized client
//! - [`fixtures`] - create-data builders and seeding helpers

pub mod fixtures;
pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
