//! Application layer - Draft coordination services
//!
//! Defines the key-value substrate port and the services built on it: the
//! draft, lock and snapshot stores, the autosave scheduler, the cross-tab
//! change notifier and the per-tab editing session that composes them.

pub mod error;
pub mod ports;
pub mod services;
pub mod settings;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
pub use settings::DraftSyncSettings;
