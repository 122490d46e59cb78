//! Domain layer for draftsync
//!
//! Drafts, advisory locks, snapshots and the change events exchanged between
//! editing tabs. Pure types; nothing here touches storage or clocks except
//! through explicit arguments and `Utc::now()` in constructors.

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use events::StorageChangeEvent;
pub use value_objects::*;
