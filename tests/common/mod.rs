//! Common test utilities for flowq workflow tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod mock_service;

#[allow(unused_imports)]
pub use fixtures::*;
pub use mock_service::*;
