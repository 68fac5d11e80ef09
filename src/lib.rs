// Core infrastructure modules
pub mod cli;
pub mod config;
pub mod core;
pub mod logging;

// Feature-specific modules
pub mod input;
pub mod query_editor;
pub mod repl;
pub mod results_grid;
pub mod session;
pub mod sql;

// In-memory collaborators for unit and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
