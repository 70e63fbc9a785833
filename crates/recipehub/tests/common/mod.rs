//! Shared test utilities for recipehub integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with temp media and toc roots
//! - Helpers that create saved projects, data, recipes and jobs

pub mod harness;

pub use harness::TestHarness;
