/// Database Module
///
/// This module provides the database layer the session engine talks to,
/// organized into focused submodules.
///
/// ## Architecture
///
/// - **Capabilities** (`backend.rs`): the narrow `Backend`/`Connector` traits the engine consumes
/// - **Result model** (`query.rs`): tabular results, coarse-typed values and their display form
/// - **Catalog SQL** (`schema.rs`): hand-built informational queries against `pg_catalog`
/// - **PostgreSQL driver** (`connection.rs`): pooled connections, TLS and per-call timeouts
///
/// ## Error Handling
///
/// All database operations use the standardized `PgshError` type for consistent error propagation.
pub mod backend;
pub mod connection;
pub mod query;
pub mod schema;

pub use backend::*;
pub use connection::*;
pub use query::*;
pub use schema::*;
