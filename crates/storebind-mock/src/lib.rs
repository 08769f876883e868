//! In-memory hierarchical data source for storebind.
//!
//! [`MockDatabase`] keeps a JSON tree and emits the same child and value
//! events a remote source would. Writes and new subscriptions are queued;
//! nothing is delivered until [`MockDatabase::flush`] runs, which makes test
//! timelines explicit.

pub mod database;
pub mod key_order;
pub mod reference;

pub use database::MockDatabase;
pub use key_order::{child_key_cmp, sorted_children};
pub use reference::MockRef;
