use std::collections::BTreeMap;

use tracing::debug;

use crate::binding::BindingHandle;

/// Where a binding lands: the module's state path plus the property name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingSlot {
    pub module: Vec<String>,
    pub key: String,
}

impl BindingSlot {
    pub fn new(module: &[String], key: impl Into<String>) -> Self {
        Self {
            module: module.to_vec(),
            key: key.into(),
        }
    }

    pub fn root(key: impl Into<String>) -> Self {
        Self {
            module: Vec::new(),
            key: key.into(),
        }
    }
}

/// Active bindings of one store, at most one per slot.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    bindings: BTreeMap<BindingSlot, BindingHandle>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the slot's current binding, if any, before `factory` runs.
    /// When `factory` fails the slot is left empty.
    pub fn bind<F, E>(&mut self, slot: BindingSlot, factory: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<BindingHandle, E>,
    {
        if let Some(mut previous) = self.bindings.remove(&slot) {
            debug!(module = ?slot.module, key = %slot.key, "replacing binding");
            previous.cancel();
        }
        let handle = factory()?;
        self.bindings.insert(slot, handle);
        Ok(())
    }

    pub fn unbind(&mut self, slot: &BindingSlot) -> bool {
        match self.bindings.remove(slot) {
            Some(mut handle) => {
                handle.cancel();
                debug!(module = ?slot.module, key = %slot.key, "unbound");
                true
            }
            None => false,
        }
    }

    pub fn is_bound(&self, slot: &BindingSlot) -> bool {
        self.bindings.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BindingSlot> {
        self.bindings.keys()
    }

    /// Cancels every binding.
    pub fn clear(&mut self) {
        for (_, mut handle) in std::mem::take(&mut self.bindings) {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &str) -> BindingHandle {
        log.lock().unwrap().push(format!("start {name}"));
        let log = Arc::clone(log);
        let name = name.to_owned();
        BindingHandle::new(name.clone(), move || {
            log.lock().unwrap().push(format!("cancel {name}"));
        })
    }

    #[test]
    fn rebind_cancels_before_creating() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        let slot = BindingSlot::root("items");
        registry
            .bind(slot.clone(), || Ok::<_, ()>(recording(&log, "a")))
            .unwrap();
        registry
            .bind(slot.clone(), || Ok::<_, ()>(recording(&log, "b")))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["start a", "cancel a", "start b"]
        );
    }

    #[test]
    fn unbind_absent_slot_is_a_noop() {
        let mut registry = BindingRegistry::new();
        assert!(!registry.unbind(&BindingSlot::root("nothing")));
        assert!(registry.is_empty());
    }

    #[test]
    fn unbind_cancels_and_removes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        let slot = BindingSlot::root("items");
        registry
            .bind(slot.clone(), || Ok::<_, ()>(recording(&log, "a")))
            .unwrap();
        assert!(registry.unbind(&slot));
        assert!(!registry.is_bound(&slot));
        assert!(!registry.unbind(&slot));
        assert_eq!(*log.lock().unwrap(), vec!["start a", "cancel a"]);
    }

    #[test]
    fn modules_do_not_collide() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        let todos = BindingSlot::new(&["todos".to_owned()], "items");
        let named = BindingSlot::new(&["named".to_owned()], "items");
        registry
            .bind(todos.clone(), || Ok::<_, ()>(recording(&log, "todos")))
            .unwrap();
        registry
            .bind(named.clone(), || Ok::<_, ()>(recording(&log, "named")))
            .unwrap();
        assert_eq!(registry.len(), 2);
        registry.unbind(&todos);
        assert!(registry.is_bound(&named));
    }

    #[test]
    fn failed_factory_leaves_slot_empty() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        let slot = BindingSlot::root("items");
        registry
            .bind(slot.clone(), || Ok::<_, &str>(recording(&log, "a")))
            .unwrap();
        let err = registry.bind(slot.clone(), || Err("boom"));
        assert_eq!(err, Err("boom"));
        assert!(!registry.is_bound(&slot));
        assert_eq!(*log.lock().unwrap(), vec!["start a", "cancel a"]);
    }

    #[test]
    fn clear_cancels_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BindingRegistry::new();
        for key in ["a", "b"] {
            registry
                .bind(BindingSlot::root(key), || Ok::<_, ()>(recording(&log, key)))
                .unwrap();
        }
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(log.lock().unwrap().len(), 4);
    }
}
