use std::collections::{BTreeMap, HashMap, VecDeque};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use storebind::{ChildEvent, ChildListener, ListenerId, Snapshot, ValueListener};
use tracing::{debug, trace};

use crate::key_order::{sort_map, sorted_children};
use crate::reference::MockRef;

/// Shared in-memory tree. Clones share the same data and listeners.
#[derive(Clone, Default)]
pub struct MockDatabase {
    inner: Arc<Mutex<DbInner>>,
}

#[derive(Default)]
struct DbInner {
    data: Value,
    queue: VecDeque<Pending>,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener_id: ListenerId,
    next_push_id: u64,
}

enum Pending {
    /// Initial delivery for a fresh subscription.
    Initial(ListenerId),
    /// Atomic group of writes, diffed as one change.
    Write(Vec<(Vec<String>, Value)>),
}

struct Listener {
    path: Vec<String>,
    sink: Sink,
}

#[derive(Clone)]
enum Sink {
    Child(Arc<Mutex<ChildListener>>),
    Value(Arc<Mutex<ValueListener>>),
}

enum Delivery {
    Child(ListenerId, ChildEvent),
    Value(ListenerId, Snapshot),
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database seeded with `data`, as if it had been written and flushed.
    pub fn with_data(data: Value) -> Self {
        let db = Self::new();
        db.lock().data = normalize(data);
        db
    }

    pub fn root(&self) -> MockRef {
        MockRef::new(self.clone(), Vec::new())
    }

    /// Reference at a slash-separated path.
    pub fn reference(&self, path: &str) -> MockRef {
        self.root().child(path)
    }

    /// Applied data of the whole tree.
    pub fn data(&self) -> Value {
        self.lock().data.clone()
    }

    /// Queued operations not yet delivered.
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Applies queued operations in order and delivers their events.
    /// Returns how many events reached a listener.
    ///
    /// Listeners run with no database lock held and may write, subscribe or
    /// unsubscribe; work they queue is processed by the same flush. They must
    /// not call `flush` themselves.
    pub fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let deliveries = {
                let mut db = self.lock();
                let Some(op) = db.queue.pop_front() else {
                    break;
                };
                db.process(op)
            };
            for delivery in deliveries {
                if self.deliver(delivery) {
                    delivered += 1;
                }
            }
        }
        trace!(delivered, "flushed");
        delivered
    }

    pub(crate) fn read(&self, path: &[String]) -> Value {
        let db = self.lock();
        value_at(&db.data, path).cloned().unwrap_or(Value::Null)
    }

    pub(crate) fn write(&self, writes: Vec<(Vec<String>, Value)>) {
        self.lock().queue.push_back(Pending::Write(writes));
    }

    pub(crate) fn next_push_key(&self) -> String {
        let mut db = self.lock();
        db.next_push_id += 1;
        format!("-M{:018}", db.next_push_id)
    }

    pub(crate) fn listen_children(&self, path: &[String], listener: ChildListener) -> ListenerId {
        self.listen(path, Sink::Child(Arc::new(Mutex::new(listener))))
    }

    pub(crate) fn listen_value(&self, path: &[String], listener: ValueListener) -> ListenerId {
        self.listen(path, Sink::Value(Arc::new(Mutex::new(listener))))
    }

    pub(crate) fn off(&self, id: ListenerId) {
        if self.lock().listeners.remove(&id).is_some() {
            debug!(id, "listener removed");
        }
    }

    fn listen(&self, path: &[String], sink: Sink) -> ListenerId {
        let mut db = self.lock();
        db.next_listener_id += 1;
        let id = db.next_listener_id;
        db.listeners.insert(
            id,
            Listener {
                path: path.to_vec(),
                sink,
            },
        );
        db.queue.push_back(Pending::Initial(id));
        debug!(id, path = %path.join("/"), "listener added");
        id
    }

    /// Calls the listener unless it was removed after the event was produced.
    fn deliver(&self, delivery: Delivery) -> bool {
        let id = match &delivery {
            Delivery::Child(id, _) | Delivery::Value(id, _) => *id,
        };
        let sink = self.lock().listeners.get(&id).map(|l| l.sink.clone());
        match (sink, delivery) {
            (Some(Sink::Child(listener)), Delivery::Child(_, event)) => {
                let mut callback = listener.lock().unwrap_or_else(PoisonError::into_inner);
                (*callback)(event);
                true
            }
            (Some(Sink::Value(listener)), Delivery::Value(_, snapshot)) => {
                let mut callback = listener.lock().unwrap_or_else(PoisonError::into_inner);
                (*callback)(snapshot);
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, DbInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DbInner {
    fn process(&mut self, op: Pending) -> Vec<Delivery> {
        match op {
            Pending::Initial(id) => self.initial(id),
            Pending::Write(writes) => {
                let before = self.data.clone();
                for (path, value) in writes {
                    write_at(&mut self.data, &path, normalize(value));
                }
                self.diff(&before)
            }
        }
    }

    fn initial(&self, id: ListenerId) -> Vec<Delivery> {
        let Some(listener) = self.listeners.get(&id) else {
            return Vec::new();
        };
        let current = value_at(&self.data, &listener.path);
        match listener.sink {
            Sink::Value(_) => vec![Delivery::Value(
                id,
                Snapshot {
                    key: listener.path.last().cloned(),
                    value: current.cloned().unwrap_or(Value::Null),
                },
            )],
            Sink::Child(_) => {
                let mut out = Vec::new();
                let mut prev: Option<String> = None;
                for (key, value) in sorted_children(current) {
                    out.push(Delivery::Child(
                        id,
                        ChildEvent::Added {
                            snapshot: Snapshot::new(Some(key.clone()), value),
                            prev_key: prev.replace(key),
                        },
                    ));
                }
                out.push(Delivery::Child(id, ChildEvent::Loaded));
                out
            }
        }
    }

    fn diff(&self, before: &Value) -> Vec<Delivery> {
        let mut out = Vec::new();
        for (&id, listener) in &self.listeners {
            let old = value_at(before, &listener.path);
            let new = value_at(&self.data, &listener.path);
            if old == new {
                continue;
            }
            match listener.sink {
                Sink::Value(_) => out.push(Delivery::Value(
                    id,
                    Snapshot {
                        key: listener.path.last().cloned(),
                        value: new.cloned().unwrap_or(Value::Null),
                    },
                )),
                Sink::Child(_) => out.extend(
                    child_events(old, new)
                        .into_iter()
                        .map(|event| Delivery::Child(id, event)),
                ),
            }
        }
        out
    }
}

/// Removals first, then additions in source order, then changes.
fn child_events(old: Option<&Value>, new: Option<&Value>) -> Vec<ChildEvent> {
    let old_children = sorted_children(old);
    let new_children = sorted_children(new);
    let old_by_key: HashMap<&str, &Value> =
        old_children.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let new_by_key: HashMap<&str, &Value> =
        new_children.iter().map(|(k, v)| (k.as_str(), v)).collect();

    let mut events = Vec::new();
    for (key, value) in &old_children {
        if !new_by_key.contains_key(key.as_str()) {
            events.push(ChildEvent::Removed {
                snapshot: Snapshot::new(Some(key.clone()), value.clone()),
            });
        }
    }
    for (index, (key, value)) in new_children.iter().enumerate() {
        if !old_by_key.contains_key(key.as_str()) {
            let prev_key = index
                .checked_sub(1)
                .map(|prev| new_children[prev].0.clone());
            events.push(ChildEvent::Added {
                snapshot: Snapshot::new(Some(key.clone()), value.clone()),
                prev_key,
            });
        }
    }
    for (key, value) in &new_children {
        if let Some(previous) = old_by_key.get(key.as_str()) {
            if *previous != value {
                events.push(ChildEvent::Changed {
                    snapshot: Snapshot::new(Some(key.clone()), value.clone()),
                });
            }
        }
    }
    events
}

fn value_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in path {
        node = node.as_object()?.get(segment)?;
    }
    (!node.is_null()).then_some(node)
}

/// Stores `value` at `path`, creating parents and pruning emptied ones.
fn write_at(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        write_at(child, rest, value);
        if child.is_null() {
            map.remove(head);
        }
        *map = sort_map(mem::take(map));
        if map.is_empty() {
            *node = Value::Null;
        }
    }
}

/// Arrays become index-keyed objects, `null` children vanish and empty
/// objects collapse to `null`.
fn normalize(value: Value) -> Value {
    match value {
        Value::Array(items) => normalize(Value::Object(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
        )),
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| {
                    let child = normalize(child);
                    (!child.is_null()).then_some((key, child))
                })
                .collect();
            if kept.is_empty() {
                Value::Null
            } else {
                Value::Object(sort_map(kept))
            }
        }
        other => other,
    }
}
