use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace, warn};

use crate::binding::BindingHandle;
use crate::config::{BindOptions, ReadyCallback};
use crate::error::BindError;
use crate::mutation::{Commit, Mutation};
use crate::reference::RemoteReference;
use crate::snapshot::{Snapshot, SnapshotReader};

/// Binds a store property to one remote node, replacing the whole record on
/// every value event.
#[derive(Debug, Clone, Default)]
pub struct ObjectBinder {
    reader: SnapshotReader,
}

struct ObjectState {
    cancelled: bool,
    on_ready: Option<ReadyCallback>,
}

impl ObjectBinder {
    pub fn new(reader: SnapshotReader) -> Self {
        Self { reader }
    }

    pub fn start(
        &self,
        state_key: &str,
        reference: Arc<dyn RemoteReference>,
        commit: Arc<dyn Commit>,
        options: BindOptions,
    ) -> Result<BindingHandle, BindError> {
        let node_key = reference.key();
        let current = reference.read();
        self.reader.read(&Snapshot {
            key: node_key.clone(),
            value: current.value,
        })?;

        let state = Arc::new(Mutex::new(ObjectState {
            cancelled: false,
            on_ready: options.on_ready,
        }));
        let listener_state = Arc::clone(&state);
        let reader = self.reader.clone();
        let key = state_key.to_owned();
        let id = reference.on_value(Box::new(move |snapshot: Snapshot| {
            let ready = {
                let mut state = listener_state.lock().unwrap_or_else(PoisonError::into_inner);
                if state.cancelled {
                    trace!(state_key = %key, "value event after cancel");
                    return;
                }
                state.on_ready.take()
            };
            let snapshot = Snapshot {
                key: node_key.clone(),
                value: snapshot.value,
            };
            match reader.read(&snapshot) {
                Ok(record) => {
                    trace!(state_key = %key, exists = snapshot.exists(), "value applied");
                    commit.commit(Mutation::SetValue {
                        key: key.clone(),
                        value: reader.materialize(&record),
                    });
                }
                Err(err) => {
                    warn!(state_key = %key, error = %err, "skipping undecodable value event");
                }
            }
            if let Some(ready) = ready {
                ready();
            }
        }));
        debug!(state_key, path = %reference.path(), "object binding started");

        let key = state_key.to_owned();
        Ok(BindingHandle::new(state_key, move || {
            state.lock().unwrap_or_else(PoisonError::into_inner).cancelled = true;
            reference.off(id);
            debug!(state_key = %key, path = %reference.path(), "object binding cancelled");
        }))
    }
}
