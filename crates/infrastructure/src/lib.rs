//! Infrastructure layer - Adapters for external systems
//!
//! Implements the key-value substrate port in memory and on SQLite, and
//! provides configuration loading and logging setup.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod telemetry;

pub use adapters::*;
pub use config::{AppConfig, LoggingConfig, StorageBackend, StorageConfig, TimingConfig};
pub use persistence::{ConnectionPool, DatabaseError, create_pool};
pub use telemetry::{TelemetryError, init_logging};
