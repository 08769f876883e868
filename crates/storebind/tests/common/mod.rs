#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use storebind::{
    BindError, BindOptions, ChildEvent, ChildListener, Commit, ListenerId, Module, Mutation,
    RemoteReference, Snapshot, Store, ValueListener,
};
use storebind_mock::{MockDatabase, MockRef};

/// Action payloads used by the test stores.
#[derive(Clone)]
pub enum Payload {
    None,
    Ref(MockRef),
    Bind { reference: MockRef, wait: bool },
}

pub fn reference(payload: &Payload) -> Option<MockRef> {
    match payload {
        Payload::Ref(reference) | Payload::Bind { reference, .. } => Some(reference.clone()),
        Payload::None => None,
    }
}

/// A fresh child of `db`'s root, like a test-local `root.push({})`.
pub fn fresh_ref(db: &MockDatabase) -> MockRef {
    db.root().push(Value::Null)
}

/// Actions: `bindItemsRef`, `setItemsRef`, `unbindItemsRef`.
pub fn items_actions(module: Module<Payload>) -> Module<Payload> {
    module
        .action("bindItemsRef", |ctx, payload| {
            if let Payload::Bind { reference, wait } = payload {
                ctx.bind_array("items", reference.clone(), BindOptions::default().wait(*wait))?;
            }
            Ok(())
        })
        .action("setItemsRef", |ctx, payload| {
            if let Some(reference) = reference(payload) {
                ctx.bind_array("items", reference, BindOptions::default())?;
            }
            Ok(())
        })
        .action("unbindItemsRef", |ctx, _| {
            ctx.unbind_reference("items");
            Ok(())
        })
}

/// Actions binding the `options` and `primitive` properties as objects.
pub fn object_actions(module: Module<Payload>) -> Module<Payload> {
    module
        .action("setOptionsRef", |ctx, payload| bind_object(ctx, "options", payload))
        .action("setPrimitiveRef", |ctx, payload| bind_object(ctx, "primitive", payload))
        .action("unbindOptionsRef", |ctx, _| {
            ctx.unbind_reference("options");
            Ok(())
        })
}

fn bind_object(
    ctx: &storebind::ActionContext<Payload>,
    key: &str,
    payload: &Payload,
) -> Result<(), BindError> {
    match reference(payload) {
        Some(reference) => ctx.bind_object(key, reference),
        None => Ok(()),
    }
}

pub fn items_store() -> Store<Payload> {
    Store::new(items_actions(Module::new().state(json!({"items": []})))).unwrap()
}

pub fn items(store: &Store<Payload>) -> Value {
    store.state()["items"].clone()
}

/// Commit sink recording every mutation it receives.
#[derive(Clone, Default)]
pub struct CommitLog {
    mutations: Arc<Mutex<Vec<Mutation>>>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> Arc<dyn Commit> {
        let mutations = Arc::clone(&self.mutations);
        Arc::new(move |mutation: Mutation| mutations.lock().unwrap().push(mutation))
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    /// Value written by the last `SET_VALUE`.
    pub fn last_value(&self) -> Option<Value> {
        self.mutations
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|m| match m {
                Mutation::SetValue { value, .. } => Some(value.clone()),
                _ => None,
            })
    }
}

#[derive(Default)]
struct ScriptedInner {
    value: Value,
    children: BTreeMap<ListenerId, Arc<Mutex<ChildListener>>>,
    values: BTreeMap<ListenerId, Arc<Mutex<ValueListener>>>,
    next_id: ListenerId,
}

/// Reference whose events are emitted by the test, in any order and at
/// any time.
#[derive(Clone)]
pub struct ScriptedRef {
    key: Option<String>,
    inner: Arc<Mutex<ScriptedInner>>,
}

impl ScriptedRef {
    pub fn new(key: &str) -> Self {
        Self::with_value(key, Value::Null)
    }

    /// `value` is what point-reads return; it is never emitted on its own.
    pub fn with_value(key: &str, value: Value) -> Self {
        Self {
            key: Some(key.to_owned()),
            inner: Arc::new(Mutex::new(ScriptedInner {
                value,
                ..ScriptedInner::default()
            })),
        }
    }

    pub fn emit(&self, event: ChildEvent) {
        let listeners: Vec<_> = self.inner.lock().unwrap().children.values().cloned().collect();
        for listener in listeners {
            let mut callback = listener.lock().unwrap();
            (*callback)(event.clone());
        }
    }

    pub fn emit_value(&self, value: Value) {
        let snapshot = Snapshot {
            key: self.key.clone(),
            value,
        };
        let listeners: Vec<_> = self.inner.lock().unwrap().values.values().cloned().collect();
        for listener in listeners {
            let mut callback = listener.lock().unwrap();
            (*callback)(snapshot.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.children.len() + inner.values.len()
    }
}

impl RemoteReference for ScriptedRef {
    fn key(&self) -> Option<String> {
        self.key.clone()
    }

    fn path(&self) -> String {
        format!("/scripted/{}", self.key.as_deref().unwrap_or(""))
    }

    fn read(&self) -> Snapshot {
        Snapshot {
            key: self.key.clone(),
            value: self.inner.lock().unwrap().value.clone(),
        }
    }

    fn on_child_events(&self, listener: ChildListener) -> ListenerId {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.children.insert(id, Arc::new(Mutex::new(listener)));
        id
    }

    fn on_value(&self, listener: ValueListener) -> ListenerId {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.values.insert(id, Arc::new(Mutex::new(listener)));
        id
    }

    fn off(&self, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap();
        inner.children.remove(&id);
        inner.values.remove(&id);
    }
}

pub fn added(key: &str, prev: Option<&str>, value: Value) -> ChildEvent {
    ChildEvent::added(Snapshot::new(Some(key), value), prev)
}

pub fn changed(key: &str, value: Value) -> ChildEvent {
    ChildEvent::Changed {
        snapshot: Snapshot::new(Some(key), value),
    }
}

pub fn removed(key: &str) -> ChildEvent {
    ChildEvent::Removed {
        snapshot: Snapshot::new(Some(key), Value::Null),
    }
}

pub fn moved(key: &str, prev: Option<&str>, value: Value) -> ChildEvent {
    ChildEvent::moved(Snapshot::new(Some(key), value), prev)
}
