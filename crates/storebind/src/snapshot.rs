//! Snapshot decoding into bound records.
//!
//! Every remote node lands in state in one of two shapes:
//! - `{ ".key": key, ...fields }` when its value is a JSON object,
//! - `{ ".key": key, ".value": value }` for everything else (scalars, `null`,
//!   arrays).
//!
//! The field names come from [`RecordFormat`]. The key is written last, so
//! a payload field with the key field's name is overwritten.

use serde_json::{Map, Value};

use crate::config::RecordFormat;
use crate::error::DecodeError;

/// Point-in-time read of one remote node.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub key: Option<String>,
    pub value: Value,
}

impl Snapshot {
    pub fn new(key: Option<impl Into<String>>, value: Value) -> Self {
        Self {
            key: key.map(Into::into),
            value,
        }
    }

    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// Child snapshots in the order the value stores them.
    pub fn children(&self) -> Vec<Snapshot> {
        match &self.value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Snapshot {
                    key: Some(k.clone()),
                    value: v.clone(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundRecord {
    Fields {
        key: Option<String>,
        fields: Map<String, Value>,
    },
    Scalar {
        key: Option<String>,
        value: Value,
    },
}

impl BoundRecord {
    pub fn key(&self) -> Option<&str> {
        match self {
            BoundRecord::Fields { key, .. } | BoundRecord::Scalar { key, .. } => key.as_deref(),
        }
    }

    pub fn is_fields(&self) -> bool {
        matches!(self, BoundRecord::Fields { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReader {
    format: RecordFormat,
}

impl SnapshotReader {
    pub fn new(format: RecordFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &RecordFormat {
        &self.format
    }

    pub fn read(&self, snapshot: &Snapshot) -> Result<BoundRecord, DecodeError> {
        if snapshot.key.as_deref() == Some("") {
            return Err(DecodeError::EmptyKey);
        }
        let key = snapshot.key.clone();
        match &snapshot.value {
            Value::Object(fields) => Ok(BoundRecord::Fields {
                key,
                fields: fields.clone(),
            }),
            other => Ok(BoundRecord::Scalar {
                key,
                value: other.clone(),
            }),
        }
    }

    /// Like [`read`](Self::read), but children must carry a key.
    pub fn read_child(&self, snapshot: &Snapshot) -> Result<BoundRecord, DecodeError> {
        if snapshot.key.is_none() {
            return Err(DecodeError::MissingKey);
        }
        self.read(snapshot)
    }

    pub fn materialize(&self, record: &BoundRecord) -> Value {
        let (key, mut out) = match record {
            BoundRecord::Fields { key, fields } => (key, fields.clone()),
            BoundRecord::Scalar { key, value } => {
                let mut out = Map::new();
                out.insert(self.format.value_field.clone(), value.clone());
                (key, out)
            }
        };
        out.insert(
            self.format.key_field.clone(),
            key.clone().map_or(Value::Null, Value::String),
        );
        Value::Object(out)
    }

    pub fn materialize_all<'a>(&self, records: impl IntoIterator<Item = &'a BoundRecord>) -> Value {
        Value::Array(records.into_iter().map(|r| self.materialize(r)).collect())
    }
}
