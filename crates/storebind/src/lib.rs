//! Store bindings for remote hierarchical event sources.
//!
//! A binding keeps one property of a store module in sync with a node of a
//! remote tree:
//! - array bindings mirror the ordered children of a node
//!   ([`ArrayBinder`]), driven by added/changed/removed/moved child events,
//! - object bindings mirror a single node as one record ([`ObjectBinder`]),
//!   replaced wholesale on every value event.
//!
//! Action handlers get an [`ActionContext`] from the [`Store`]; its
//! `bind_reference` / `unbind_reference` go through the per-store
//! [`BindingRegistry`], which guarantees one live subscription per
//! (module, key).

pub mod action;
pub mod array_binder;
pub mod binding;
pub mod config;
pub mod error;
pub mod event;
pub mod mirror;
pub mod mutation;
pub mod object_binder;
pub mod reference;
pub mod registry;
pub mod snapshot;
pub mod store;

pub use action::{ActionContext, BindingKind};
pub use array_binder::ArrayBinder;
pub use binding::BindingHandle;
pub use config::{ArrayCommitStyle, BindOptions, ReadyCallback, RecordFormat, StoreConfig};
pub use error::{BindError, DecodeError, StoreError};
pub use event::ChildEvent;
pub use mirror::{ArrayMirror, MirrorEdit};
pub use mutation::{Commit, Mutation};
pub use object_binder::ObjectBinder;
pub use reference::{ChildListener, ListenerId, RemoteReference, ValueListener};
pub use registry::{BindingRegistry, BindingSlot};
pub use snapshot::{BoundRecord, Snapshot, SnapshotReader};
pub use store::{ActionHandler, Module, Store};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
