//! Shared helpers for the integration tests.
//!
//! Note: We use `helpers/mod.rs` instead of `helpers.rs` because Cargo
//! auto-discovers top-level `.rs` files in `tests/` as integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod log_capture;

use std::time::Duration;

pub fn ns(n: u64) -> Duration {
    Duration::from_nanos(n)
}
