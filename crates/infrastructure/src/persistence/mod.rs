//! Persistence module
//!
//! SQLite connection pooling and schema migrations for the durable substrate.

pub mod connection;
pub mod error;
pub mod migrations;

pub use connection::{ConnectionPool, DatabaseError, IN_MEMORY_PATH, PooledConn, create_pool};
pub use error::map_database_error;
