use crate::snapshot::Snapshot;

/// Child-level notification from a remote node.
///
/// `prev_key` names the sibling the child now follows; `None` means it is
/// the first child.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildEvent {
    Added {
        snapshot: Snapshot,
        prev_key: Option<String>,
    },
    Changed {
        snapshot: Snapshot,
    },
    Removed {
        snapshot: Snapshot,
    },
    Moved {
        snapshot: Snapshot,
        prev_key: Option<String>,
    },
    /// Every child present at subscription time has been delivered.
    Loaded,
}

impl ChildEvent {
    pub fn added(snapshot: Snapshot, prev_key: Option<impl Into<String>>) -> Self {
        ChildEvent::Added {
            snapshot,
            prev_key: prev_key.map(Into::into),
        }
    }

    pub fn moved(snapshot: Snapshot, prev_key: Option<impl Into<String>>) -> Self {
        ChildEvent::Moved {
            snapshot,
            prev_key: prev_key.map(Into::into),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChildEvent::Added { .. } => "child_added",
            ChildEvent::Changed { .. } => "child_changed",
            ChildEvent::Removed { .. } => "child_removed",
            ChildEvent::Moved { .. } => "child_moved",
            ChildEvent::Loaded => "loaded",
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            ChildEvent::Added { snapshot, .. }
            | ChildEvent::Changed { snapshot }
            | ChildEvent::Removed { snapshot }
            | ChildEvent::Moved { snapshot, .. } => Some(snapshot),
            ChildEvent::Loaded => None,
        }
    }

    pub fn child_key(&self) -> Option<&str> {
        self.snapshot().and_then(|s| s.key.as_deref())
    }
}
