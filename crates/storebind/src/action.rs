//! Binding capabilities handed to action handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::BindOptions;
use crate::error::{BindError, StoreError};
use crate::mutation::Mutation;
use crate::reference::RemoteReference;
use crate::registry::BindingSlot;
use crate::store::Store;

/// Shape of a binding, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Ordered children of the node, as an array of records.
    Array,
    /// The node itself, as one record.
    Object,
}

/// Context of one running action handler. Everything it commits or binds
/// lands in the state of the module that registered the handler.
pub struct ActionContext<P> {
    store: Store<P>,
    module: Vec<String>,
    namespace: String,
}

impl<P> ActionContext<P> {
    pub(crate) fn new(store: Store<P>, module: Vec<String>, namespace: String) -> Self {
        Self {
            store,
            module,
            namespace,
        }
    }

    pub fn module_path(&self) -> &[String] {
        &self.module
    }

    /// Action-name prefix of the module, `""` outside namespaced modules.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Module-local state.
    pub fn state(&self) -> Value {
        self.store.module_value(&self.module).unwrap_or(Value::Null)
    }

    pub fn store(&self) -> &Store<P> {
        &self.store
    }

    pub fn commit(&self, mutation: Mutation) -> Result<(), StoreError> {
        self.store.apply(&self.module, mutation)
    }

    /// Dispatches `action` relative to this module's namespace.
    pub fn dispatch(&self, action: &str, payload: &P) -> Result<usize, BindError> {
        self.store
            .dispatch(&format!("{}{}", self.namespace, action), payload)
    }

    /// Binds `state_key` of this module to `reference`, replacing whatever
    /// binding the key had.
    pub fn bind_reference<R>(
        &self,
        state_key: &str,
        reference: R,
        kind: BindingKind,
        options: BindOptions,
    ) -> Result<(), BindError>
    where
        R: RemoteReference + 'static,
    {
        let reference: Arc<dyn RemoteReference> = Arc::new(reference);
        let commit = self.store.module_commit(&self.module);
        let slot = BindingSlot::new(&self.module, state_key);
        debug!(module = ?self.module, state_key, ?kind, path = %reference.path(), "bind");
        self.store.registry().bind(slot, || match kind {
            BindingKind::Array => self
                .store
                .array_binder()
                .start(state_key, reference, commit, options),
            BindingKind::Object => self
                .store
                .object_binder()
                .start(state_key, reference, commit, options),
        })
    }

    pub fn bind_array<R>(
        &self,
        state_key: &str,
        reference: R,
        options: BindOptions,
    ) -> Result<(), BindError>
    where
        R: RemoteReference + 'static,
    {
        self.bind_reference(state_key, reference, BindingKind::Array, options)
    }

    pub fn bind_object<R>(&self, state_key: &str, reference: R) -> Result<(), BindError>
    where
        R: RemoteReference + 'static,
    {
        self.bind_reference(state_key, reference, BindingKind::Object, BindOptions::default())
    }

    /// Stops the binding of `state_key`; the last value stays in state.
    /// Returns `false` when nothing was bound.
    pub fn unbind_reference(&self, state_key: &str) -> bool {
        self.store
            .registry()
            .unbind(&BindingSlot::new(&self.module, state_key))
    }
}
