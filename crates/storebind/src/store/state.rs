use std::sync::{Mutex, PoisonError};

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::StoreError;
use crate::mutation::{Commit, Mutation};

/// The store's state tree. Module state lives under the module's name in its
/// parent's object.
#[derive(Debug)]
pub(crate) struct StateTree {
    root: Mutex<Value>,
}

impl StateTree {
    pub(crate) fn new(root: Value) -> Self {
        Self {
            root: Mutex::new(root),
        }
    }

    pub(crate) fn snapshot(&self) -> Value {
        self.root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn get(&self, module: &[String]) -> Option<Value> {
        let root = self.root.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cur = &*root;
        for name in module {
            cur = cur.as_object()?.get(name)?;
        }
        Some(cur.clone())
    }

    pub(crate) fn apply(&self, module: &[String], mutation: Mutation) -> Result<(), StoreError> {
        let mut root = self.root.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cur = &mut *root;
        for name in module {
            cur = cur
                .as_object_mut()
                .and_then(|map| map.get_mut(name))
                .ok_or_else(|| StoreError::UnknownModule(module.join("/")))?;
        }
        let state = cur
            .as_object_mut()
            .ok_or_else(|| StoreError::NotAnObject(module.join("/")))?;
        apply_mutation(state, mutation)
    }
}

pub(crate) fn apply_mutation(
    state: &mut Map<String, Value>,
    mutation: Mutation,
) -> Result<(), StoreError> {
    match mutation {
        Mutation::SetValue { key, value } => {
            state.insert(key, value);
            Ok(())
        }
        Mutation::ArrayInsert { key, index, record } => {
            let array = array_at(state, &key)?;
            if index > array.len() {
                return Err(out_of_bounds(key, index, array.len()));
            }
            array.insert(index, record);
            Ok(())
        }
        Mutation::ArrayChange { key, index, record } => {
            let array = array_at(state, &key)?;
            let len = array.len();
            match array.get_mut(index) {
                Some(slot) => {
                    *slot = record;
                    Ok(())
                }
                None => Err(out_of_bounds(key, index, len)),
            }
        }
        Mutation::ArrayRemove { key, index } => {
            let array = array_at(state, &key)?;
            if index >= array.len() {
                return Err(out_of_bounds(key, index, array.len()));
            }
            array.remove(index);
            Ok(())
        }
    }
}

fn array_at<'a>(
    state: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Vec<Value>, StoreError> {
    state
        .get_mut(key)
        .and_then(Value::as_array_mut)
        .ok_or_else(|| StoreError::NotAnArray(key.to_owned()))
}

fn out_of_bounds(key: String, index: usize, len: usize) -> StoreError {
    StoreError::IndexOutOfBounds { key, index, len }
}

/// Commit function scoped to one module of a [`StateTree`].
pub(crate) struct ModuleCommit {
    pub(crate) state: std::sync::Arc<StateTree>,
    pub(crate) module: Vec<String>,
}

impl Commit for ModuleCommit {
    fn commit(&self, mutation: Mutation) {
        let name = mutation.name();
        let key = mutation.state_key().to_owned();
        if let Err(err) = self.state.apply(&self.module, mutation) {
            warn!(module = ?self.module, mutation = name, key = %key, error = %err, "commit rejected");
        }
    }
}
