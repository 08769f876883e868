//! Ordered mirror of a remote node's children.
//!
//! Each entry remembers the sibling key its last Added/Moved event declared
//! as predecessor. A child whose predecessor has not arrived yet is placed
//! first and re-homed, together with the chain linked behind it, as soon as
//! the predecessor shows up. Once every child of a consistent sibling chain
//! is present the mirror order equals the chain order, whatever order the
//! events came in.

use crate::error::DecodeError;
use crate::event::ChildEvent;
use crate::snapshot::{BoundRecord, Snapshot, SnapshotReader};
use serde_json::Value;

/// Effect of one event on the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorEdit {
    Inserted(usize),
    Changed(usize),
    Removed(usize),
    /// More than one position changed.
    Reordered,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    prev: Option<String>,
    record: BoundRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayMirror {
    entries: Vec<Entry>,
}

impl ArrayMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&BoundRecord> {
        self.entries.get(index).map(|e| &e.record)
    }

    pub fn records(&self) -> impl Iterator<Item = &BoundRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn to_value(&self, reader: &SnapshotReader) -> Value {
        reader.materialize_all(self.records())
    }

    pub fn add(&mut self, key: String, record: BoundRecord, prev: Option<String>) -> MirrorEdit {
        let mut reordered = false;
        if let Some(pos) = self.position(&key) {
            self.detach(pos);
            reordered = true;
        }
        let index = self.index_after(prev.as_deref());
        self.relink_follower(index, prev.as_deref(), &key);
        self.entries.insert(
            index,
            Entry {
                key: key.clone(),
                prev,
                record,
            },
        );
        if self.adopt_waiting(&key) {
            reordered = true;
        }
        if reordered {
            MirrorEdit::Reordered
        } else {
            MirrorEdit::Inserted(index)
        }
    }

    pub fn change(&mut self, key: &str, record: BoundRecord) -> Option<MirrorEdit> {
        let pos = self.position(key)?;
        let entry = &mut self.entries[pos];
        if entry.record == record {
            return None;
        }
        entry.record = record;
        Some(MirrorEdit::Changed(pos))
    }

    pub fn remove(&mut self, key: &str) -> Option<MirrorEdit> {
        let pos = self.position(key)?;
        self.detach(pos);
        Some(MirrorEdit::Removed(pos))
    }

    pub fn move_after(
        &mut self,
        key: &str,
        record: BoundRecord,
        prev: Option<String>,
    ) -> Option<MirrorEdit> {
        let pos = self.position(key)?;
        let old = self.detach(pos);
        let index = self.index_after(prev.as_deref());
        self.relink_follower(index, prev.as_deref(), &old.key);
        let unchanged = old.record == record;
        self.entries.insert(
            index,
            Entry {
                key: old.key,
                prev,
                record,
            },
        );
        match (index == pos, unchanged) {
            (true, true) => None,
            (true, false) => Some(MirrorEdit::Changed(index)),
            _ => Some(MirrorEdit::Reordered),
        }
    }

    /// Applies one child event. Events for unknown keys leave the mirror
    /// untouched and return `Ok(None)`.
    pub fn apply(
        &mut self,
        event: &ChildEvent,
        reader: &SnapshotReader,
    ) -> Result<Option<MirrorEdit>, DecodeError> {
        match event {
            ChildEvent::Added { snapshot, prev_key } => {
                let (key, record) = decode_child(snapshot, reader)?;
                Ok(Some(self.add(key, record, prev_key.clone())))
            }
            ChildEvent::Changed { snapshot } => {
                let (key, record) = decode_child(snapshot, reader)?;
                Ok(self.change(&key, record))
            }
            ChildEvent::Removed { snapshot } => {
                let key = snapshot.key.as_deref().ok_or(DecodeError::MissingKey)?;
                Ok(self.remove(key))
            }
            ChildEvent::Moved { snapshot, prev_key } => {
                let (key, record) = decode_child(snapshot, reader)?;
                Ok(self.move_after(&key, record, prev_key.clone()))
            }
            ChildEvent::Loaded => Ok(None),
        }
    }

    fn index_after(&self, prev: Option<&str>) -> usize {
        prev.and_then(|p| self.position(p)).map_or(0, |i| i + 1)
    }

    /// Removes the entry at `pos`; a follower linked to it is relinked to
    /// the removed entry's predecessor.
    fn detach(&mut self, pos: usize) -> Entry {
        let entry = self.entries.remove(pos);
        let predecessor = pos
            .checked_sub(1)
            .map(|i| self.entries[i].key.clone());
        if let Some(next) = self.entries.get_mut(pos) {
            if next.prev.as_deref() == Some(entry.key.as_str()) {
                next.prev = predecessor;
            }
        }
        entry
    }

    /// The entry about to be pushed back from `index` now follows `key`
    /// if it declared the same predecessor as the inserted entry.
    fn relink_follower(&mut self, index: usize, prev: Option<&str>, key: &str) {
        if let Some(next) = self.entries.get_mut(index) {
            if next.prev.as_deref() == prev {
                next.prev = Some(key.to_owned());
            }
        }
    }

    fn adopt_waiting(&mut self, key: &str) -> bool {
        let waiting: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key != key && e.prev.as_deref() == Some(key))
            .map(|e| e.key.clone())
            .collect();
        let mut moved = false;
        for head in waiting {
            let (Some(start), Some(anchor)) = (self.position(&head), self.position(key)) else {
                continue;
            };
            if start == anchor + 1 {
                continue;
            }
            let end = self.chain_end(start, key);
            let chain: Vec<Entry> = self.entries.drain(start..end).collect();
            let Some(anchor) = self.position(key) else {
                break;
            };
            let tail = self.entries.split_off(anchor + 1);
            self.entries.extend(chain);
            self.entries.extend(tail);
            moved = true;
        }
        moved
    }

    /// End (exclusive) of the run of entries linked behind `start`.
    fn chain_end(&self, start: usize, stop: &str) -> usize {
        let mut end = start + 1;
        while end < self.entries.len()
            && self.entries[end].key != stop
            && self.entries[end].prev.as_deref() == Some(self.entries[end - 1].key.as_str())
        {
            end += 1;
        }
        end
    }
}

fn decode_child(
    snapshot: &Snapshot,
    reader: &SnapshotReader,
) -> Result<(String, BoundRecord), DecodeError> {
    let record = reader.read_child(snapshot)?;
    let key = snapshot.key.clone().ok_or(DecodeError::MissingKey)?;
    Ok((key, record))
}
