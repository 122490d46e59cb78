//! Error mapping from the SQLite layer to the application layer

use application::error::ApplicationError;

use super::connection::DatabaseError;

/// Map a database error to an application-layer storage failure
pub fn map_database_error(e: impl Into<DatabaseError>) -> ApplicationError {
    ApplicationError::Storage(e.into().to_string())
}
