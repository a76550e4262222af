//! Common test utilities for rampart

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
