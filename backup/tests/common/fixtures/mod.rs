//! This module provides reusable test utilities:
//! - Test configuration builders
//! - File-backed test stores with a small domain table
//! - Common test data and file helpers

// Allow unused code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod test_config;
pub mod test_data;
pub mod test_database;

// Re-export commonly used items
pub use test_config::TestConfigBuilder;
pub use test_data::*;
pub use test_database::{TestStore, TestWorkspace};
