//! Minimal module-aware store the binders commit into.
//!
//! The store owns the state tree, the action table and the
//! [`BindingRegistry`]. Dropping the last clone of a store cancels every
//! binding it still holds.

mod module;
mod state;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::trace;

use crate::action::ActionContext;
use crate::array_binder::ArrayBinder;
use crate::config::StoreConfig;
use crate::error::{BindError, StoreError};
use crate::mutation::{Commit, Mutation};
use crate::object_binder::ObjectBinder;
use crate::registry::{BindingRegistry, BindingSlot};
use crate::snapshot::SnapshotReader;

pub use module::{ActionHandler, Module};
use module::{ActionTable, RegisteredAction};
use state::{ModuleCommit, StateTree};

pub struct Store<P = ()> {
    inner: Arc<StoreInner<P>>,
}

struct StoreInner<P> {
    state: Arc<StateTree>,
    registry: Mutex<BindingRegistry>,
    actions: ActionTable<P>,
    config: StoreConfig,
    array_binder: ArrayBinder,
    object_binder: ObjectBinder,
}

impl<P> Clone for Store<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for Store<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.snapshot())
            .field("actions", &self.inner.actions.keys().collect::<Vec<_>>())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<P> Store<P> {
    pub fn new(root: Module<P>) -> Result<Self, StoreError> {
        Self::with_config(root, StoreConfig::default())
    }

    pub fn with_config(root: Module<P>, config: StoreConfig) -> Result<Self, StoreError> {
        let mut actions = ActionTable::new();
        let state = install(root, Vec::new(), String::new(), &mut actions)?;
        let reader = SnapshotReader::new(config.record_format.clone());
        Ok(Self {
            inner: Arc::new(StoreInner {
                state: Arc::new(StateTree::new(state)),
                registry: Mutex::new(BindingRegistry::new()),
                actions,
                array_binder: ArrayBinder::new(reader.clone(), config.array_commits),
                object_binder: ObjectBinder::new(reader),
                config,
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Full state tree.
    pub fn state(&self) -> Value {
        self.inner.state.snapshot()
    }

    pub fn module_state(&self, module: &[&str]) -> Option<Value> {
        self.inner.state.get(&owned_path(module))
    }

    pub fn commit(&self, module: &[&str], mutation: Mutation) -> Result<(), StoreError> {
        self.inner.state.apply(&owned_path(module), mutation)
    }

    /// Runs every handler registered under `action` and returns how many ran.
    /// The first handler error stops the dispatch.
    pub fn dispatch(&self, action: &str, payload: &P) -> Result<usize, BindError> {
        let handlers = self
            .inner
            .actions
            .get(action)
            .ok_or_else(|| StoreError::UnknownAction(action.to_owned()))?;
        trace!(action, handlers = handlers.len(), "dispatch");
        for registered in handlers {
            let context = ActionContext::new(
                self.clone(),
                registered.module.clone(),
                registered.namespace.clone(),
            );
            (registered.handler)(&context, payload)?;
        }
        Ok(handlers.len())
    }

    pub fn is_bound(&self, module: &[&str], key: &str) -> bool {
        self.registry()
            .is_bound(&BindingSlot::new(&owned_path(module), key))
    }

    pub fn binding_count(&self) -> usize {
        self.registry().len()
    }

    /// Cancels every binding; state is left as it is.
    pub fn unbind_all(&self) {
        self.registry().clear();
    }

    pub(crate) fn registry(&self) -> std::sync::MutexGuard<'_, BindingRegistry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn module_commit(&self, module: &[String]) -> Arc<dyn Commit> {
        Arc::new(ModuleCommit {
            state: Arc::clone(&self.inner.state),
            module: module.to_vec(),
        })
    }

    pub(crate) fn module_value(&self, module: &[String]) -> Option<Value> {
        self.inner.state.get(module)
    }

    pub(crate) fn apply(&self, module: &[String], mutation: Mutation) -> Result<(), StoreError> {
        self.inner.state.apply(module, mutation)
    }

    pub(crate) fn array_binder(&self) -> &ArrayBinder {
        &self.inner.array_binder
    }

    pub(crate) fn object_binder(&self) -> &ObjectBinder {
        &self.inner.object_binder
    }
}

fn owned_path(module: &[&str]) -> Vec<String> {
    module.iter().map(|s| (*s).to_owned()).collect()
}

fn install<P>(
    module: Module<P>,
    path: Vec<String>,
    namespace: String,
    actions: &mut ActionTable<P>,
) -> Result<Value, StoreError> {
    let Value::Object(mut state) = module.state else {
        return Err(StoreError::NotAnObject(path.join("/")));
    };
    for (name, handler) in module.actions {
        actions
            .entry(format!("{namespace}{name}"))
            .or_default()
            .push(RegisteredAction {
                module: path.clone(),
                namespace: namespace.clone(),
                handler,
            });
    }
    for (name, child) in module.modules {
        let child_namespace = if child.namespaced {
            format!("{namespace}{name}/")
        } else {
            namespace.clone()
        };
        let mut child_path = path.clone();
        child_path.push(name.clone());
        let child_state = install(child, child_path, child_namespace, actions)?;
        state.insert(name, child_state);
    }
    Ok(Value::Object(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(key: &str, value: Value) -> Mutation {
        Mutation::SetValue {
            key: key.into(),
            value,
        }
    }

    #[test]
    fn nests_module_state() {
        let store: Store = Store::new(
            Module::new()
                .state(json!({"items": []}))
                .module("todos", Module::new().state(json!({"items": [], "options": null}))),
        )
        .unwrap();
        assert_eq!(
            store.state(),
            json!({"items": [], "todos": {"items": [], "options": null}})
        );
        assert_eq!(store.module_state(&["todos"]), Some(json!({"items": [], "options": null})));
    }

    #[test]
    fn rejects_non_object_module_state() {
        let err = Store::<()>::new(Module::new().module("bad", Module::new().state(json!([]))))
            .unwrap_err();
        assert_eq!(err, StoreError::NotAnObject("bad".into()));
    }

    #[test]
    fn namespaced_actions_are_prefixed() {
        let store: Store = Store::new(
            Module::new()
                .module(
                    "named",
                    Module::new()
                        .namespaced(true)
                        .state(json!({"n": 0}))
                        .action("bump", |ctx, _| {
                            ctx.commit(set("n", json!(1)))?;
                            Ok(())
                        }),
                )
                .module(
                    "plain",
                    Module::new().state(json!({"n": 0})).action("bump", |ctx, _| {
                        ctx.commit(set("n", json!(2)))?;
                        Ok(())
                    }),
                ),
        )
        .unwrap();
        assert_eq!(store.dispatch("bump", &()), Ok(1));
        assert_eq!(store.state(), json!({"named": {"n": 0}, "plain": {"n": 2}}));
        assert_eq!(store.dispatch("named/bump", &()), Ok(1));
        assert_eq!(store.state(), json!({"named": {"n": 1}, "plain": {"n": 2}}));
    }

    #[test]
    fn plain_modules_share_action_names() {
        let handler = |ctx: &ActionContext<()>, _: &()| -> Result<(), BindError> {
            ctx.commit(set("hit", json!(true)))?;
            Ok(())
        };
        let store: Store = Store::new(
            Module::new()
                .module("a", Module::new().action("touch", handler))
                .module("b", Module::new().action("touch", handler)),
        )
        .unwrap();
        assert_eq!(store.dispatch("touch", &()), Ok(2));
        assert_eq!(store.state(), json!({"a": {"hit": true}, "b": {"hit": true}}));
    }

    #[test]
    fn unknown_action() {
        let store: Store = Store::new(Module::new()).unwrap();
        assert_eq!(
            store.dispatch("nope", &()),
            Err(BindError::Store(StoreError::UnknownAction("nope".into())))
        );
    }

    #[test]
    fn commit_is_module_local() {
        let store: Store = Store::new(
            Module::new()
                .state(json!({"v": 0}))
                .module("m", Module::new().state(json!({"v": 0}))),
        )
        .unwrap();
        store.commit(&["m"], set("v", json!(5))).unwrap();
        assert_eq!(store.state(), json!({"v": 0, "m": {"v": 5}}));
    }
}
