/// Core Module for pgsh
///
/// This module contains the shared infrastructure the session engine is
/// built on: the error type and the database layer (capability traits,
/// result model, catalog SQL and the concrete PostgreSQL backend).

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{PgshError, Result};
