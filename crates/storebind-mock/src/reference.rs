use std::fmt;

use serde_json::{Map, Value};
use storebind::{ChildListener, ListenerId, RemoteReference, Snapshot, ValueListener};

use crate::database::MockDatabase;

/// Handle to one path of a [`MockDatabase`].
///
/// Writes are queued and only become visible, to reads and to listeners,
/// once the database is flushed.
#[derive(Clone)]
pub struct MockRef {
    db: MockDatabase,
    path: Vec<String>,
}

impl MockRef {
    pub(crate) fn new(db: MockDatabase, path: Vec<String>) -> Self {
        Self { db, path }
    }

    /// Reference below this one; `path` may contain several segments.
    pub fn child(&self, path: &str) -> MockRef {
        let mut segments = self.path.clone();
        segments.extend(split_path(path));
        MockRef::new(self.db.clone(), segments)
    }

    pub fn parent(&self) -> Option<MockRef> {
        let (_, parent) = self.path.split_last()?;
        Some(MockRef::new(self.db.clone(), parent.to_vec()))
    }

    pub fn database(&self) -> &MockDatabase {
        &self.db
    }

    pub fn set(&self, value: Value) {
        self.db.write(vec![(self.path.clone(), value)]);
    }

    /// Writes several relative paths as one change.
    pub fn update(&self, values: Map<String, Value>) {
        let writes = values
            .into_iter()
            .map(|(relative, value)| {
                let mut path = self.path.clone();
                path.extend(split_path(&relative));
                (path, value)
            })
            .collect();
        self.db.write(writes);
    }

    pub fn remove(&self) {
        self.set(Value::Null);
    }

    /// Creates a child with a generated key that sorts after every key
    /// previously generated by this database.
    pub fn push(&self, value: Value) -> MockRef {
        let child = self.child(&self.db.next_push_key());
        if !value.is_null() {
            child.set(value);
        }
        child
    }

    /// Applied value at this path.
    pub fn data(&self) -> Value {
        self.db.read(&self.path)
    }

    pub fn flush(&self) -> usize {
        self.db.flush()
    }
}

impl RemoteReference for MockRef {
    fn key(&self) -> Option<String> {
        self.path.last().cloned()
    }

    fn path(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    fn read(&self) -> Snapshot {
        Snapshot {
            key: self.key(),
            value: self.data(),
        }
    }

    fn on_child_events(&self, listener: ChildListener) -> ListenerId {
        self.db.listen_children(&self.path, listener)
    }

    fn on_value(&self, listener: ValueListener) -> ListenerId {
        self.db.listen_value(&self.path, listener)
    }

    fn off(&self, id: ListenerId) {
        self.db.off(id);
    }
}

impl fmt::Debug for MockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockRef({})", RemoteReference::path(self))
    }
}

fn split_path(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
}
