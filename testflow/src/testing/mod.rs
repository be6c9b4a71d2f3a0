//! Testing utilities for harness runs.
//!
//! This module provides:
//! - A scripted executor that records calls instead of spawning processes
//! - Assertions over outcome logs and run reports
//! - Shell-script configuration fixtures

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_exit_code, assert_not_reported, assert_reported, assert_stage_order,
    assert_stage_status,
};
pub use fixtures::ShellHarness;
pub use mocks::{Invocation, ScriptedExecutor};
