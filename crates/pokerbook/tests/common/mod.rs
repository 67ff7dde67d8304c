//! Shared test utilities for pokerbook integration tests.
//!
//! - `TestHarness` for isolated book runs over temp directories
//! - scripted capabilities and generated page fixtures in `fakes`

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
