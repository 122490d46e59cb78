//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod key_value_store;

pub use key_value_store::{ChangeListener, KeyChange, KeyValueStorePort, Subscription};
#[cfg(test)]
pub use key_value_store::MockKeyValueStorePort;
