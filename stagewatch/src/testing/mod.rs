//! Testing utilities for the dashboard client.
//!
//! This module provides:
//! - A scripted in-process backend
//! - Entity and record fixtures

mod fixtures;
mod mocks;

pub use fixtures::{product_with_statuses, record};
pub use mocks::ScriptedBackend;
