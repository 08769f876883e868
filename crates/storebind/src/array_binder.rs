//! Array bindings: a store property mirroring the ordered children of a
//! remote node.
//!
//! Without `wait` the property is reset to `[]` at bind time and every
//! child event that changes the mirror is committed right away. With `wait`
//! the property is left alone and events are staged until the source
//! reports `Loaded`; the staged events are then replayed and committed as a
//! single `SET_VALUE`.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::binding::BindingHandle;
use crate::config::{ArrayCommitStyle, BindOptions, ReadyCallback};
use crate::error::BindError;
use crate::event::ChildEvent;
use crate::mirror::{ArrayMirror, MirrorEdit};
use crate::mutation::{Commit, Mutation};
use crate::reference::RemoteReference;
use crate::snapshot::SnapshotReader;

#[derive(Debug, Clone, Default)]
pub struct ArrayBinder {
    reader: SnapshotReader,
    style: ArrayCommitStyle,
}

struct ArrayState {
    mirror: ArrayMirror,
    /// `Some` until `Loaded` arrives in wait mode.
    staging: Option<Vec<ChildEvent>>,
    cancelled: bool,
    on_ready: Option<ReadyCallback>,
}

struct ArrayListener {
    state_key: String,
    state: Arc<Mutex<ArrayState>>,
    commit: Arc<dyn Commit>,
    reader: SnapshotReader,
    style: ArrayCommitStyle,
}

impl ArrayBinder {
    pub fn new(reader: SnapshotReader, style: ArrayCommitStyle) -> Self {
        Self { reader, style }
    }

    pub fn start(
        &self,
        state_key: &str,
        reference: Arc<dyn RemoteReference>,
        commit: Arc<dyn Commit>,
        options: BindOptions,
    ) -> Result<BindingHandle, BindError> {
        for child in reference.read().children() {
            self.reader.read_child(&child)?;
        }

        let state = Arc::new(Mutex::new(ArrayState {
            mirror: ArrayMirror::new(),
            staging: options.wait.then(Vec::new),
            cancelled: false,
            on_ready: options.on_ready,
        }));
        if !options.wait {
            commit.commit(Mutation::SetValue {
                key: state_key.to_owned(),
                value: Value::Array(Vec::new()),
            });
        }

        let listener = ArrayListener {
            state_key: state_key.to_owned(),
            state: Arc::clone(&state),
            commit,
            reader: self.reader.clone(),
            style: self.style,
        };
        let id = reference.on_child_events(Box::new(move |event| listener.handle(event)));
        debug!(
            state_key,
            path = %reference.path(),
            wait = options.wait,
            "array binding started"
        );

        let key = state_key.to_owned();
        Ok(BindingHandle::new(state_key, move || {
            {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.cancelled = true;
                if let Some(staged) = state.staging.take() {
                    debug!(state_key = %key, discarded = staged.len(), "dropping staged events");
                }
            }
            reference.off(id);
            debug!(state_key = %key, path = %reference.path(), "array binding cancelled");
        }))
    }
}

impl ArrayListener {
    fn handle(&self, event: ChildEvent) {
        let (mutation, ready) = {
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let state = &mut *guard;
            if state.cancelled {
                trace!(state_key = %self.state_key, kind = event.kind(), "event after cancel");
                return;
            }
            if let Some(buffer) = state.staging.as_mut() {
                if !matches!(event, ChildEvent::Loaded) {
                    buffer.push(event);
                    return;
                }
            }
            match state.staging.take() {
                Some(staged) => {
                    let mut mirror = ArrayMirror::new();
                    for staged_event in &staged {
                        if let Err(err) = mirror.apply(staged_event, &self.reader) {
                            self.skip(staged_event, &err);
                        }
                    }
                    debug!(
                        state_key = %self.state_key,
                        records = mirror.len(),
                        events = staged.len(),
                        "initial load complete"
                    );
                    let value = mirror.to_value(&self.reader);
                    state.mirror = mirror;
                    let mutation = Mutation::SetValue {
                        key: self.state_key.clone(),
                        value,
                    };
                    (Some(mutation), state.on_ready.take())
                }
                None if matches!(event, ChildEvent::Loaded) => (None, state.on_ready.take()),
                None => match state.mirror.apply(&event, &self.reader) {
                    Ok(Some(edit)) => {
                        trace!(
                            state_key = %self.state_key,
                            kind = event.kind(),
                            child = event.child_key(),
                            ?edit,
                            "applied"
                        );
                        (Some(self.mutation_for(edit, &state.mirror)), None)
                    }
                    Ok(None) => {
                        trace!(
                            state_key = %self.state_key,
                            kind = event.kind(),
                            child = event.child_key(),
                            "no effect"
                        );
                        (None, None)
                    }
                    Err(err) => {
                        self.skip(&event, &err);
                        (None, None)
                    }
                },
            }
        };
        if let Some(mutation) = mutation {
            self.commit.commit(mutation);
        }
        if let Some(ready) = ready {
            ready();
        }
    }

    fn mutation_for(&self, edit: MirrorEdit, mirror: &ArrayMirror) -> Mutation {
        let key = self.state_key.clone();
        if self.style == ArrayCommitStyle::Incremental {
            match edit {
                MirrorEdit::Inserted(index) => {
                    if let Some(record) = mirror.get(index) {
                        return Mutation::ArrayInsert {
                            key,
                            index,
                            record: self.reader.materialize(record),
                        };
                    }
                }
                MirrorEdit::Changed(index) => {
                    if let Some(record) = mirror.get(index) {
                        return Mutation::ArrayChange {
                            key,
                            index,
                            record: self.reader.materialize(record),
                        };
                    }
                }
                MirrorEdit::Removed(index) => return Mutation::ArrayRemove { key, index },
                MirrorEdit::Reordered => {}
            }
        }
        Mutation::SetValue {
            key,
            value: mirror.to_value(&self.reader),
        }
    }

    fn skip(&self, event: &ChildEvent, err: &dyn std::error::Error) {
        warn!(
            state_key = %self.state_key,
            kind = event.kind(),
            child = event.child_key(),
            error = %err,
            "skipping undecodable child event"
        );
    }
}
