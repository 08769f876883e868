use serde_json::Value;

pub const SET_VALUE: &str = "SET_VALUE";
pub const ARRAY_INSERT: &str = "ARRAY_INSERT";
pub const ARRAY_CHANGE: &str = "ARRAY_CHANGE";
pub const ARRAY_REMOVE: &str = "ARRAY_REMOVE";

/// State mutation issued by binders, relative to one store module.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetValue {
        key: String,
        value: Value,
    },
    ArrayInsert {
        key: String,
        index: usize,
        record: Value,
    },
    ArrayChange {
        key: String,
        index: usize,
        record: Value,
    },
    ArrayRemove {
        key: String,
        index: usize,
    },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetValue { .. } => SET_VALUE,
            Mutation::ArrayInsert { .. } => ARRAY_INSERT,
            Mutation::ArrayChange { .. } => ARRAY_CHANGE,
            Mutation::ArrayRemove { .. } => ARRAY_REMOVE,
        }
    }

    pub fn state_key(&self) -> &str {
        match self {
            Mutation::SetValue { key, .. }
            | Mutation::ArrayInsert { key, .. }
            | Mutation::ArrayChange { key, .. }
            | Mutation::ArrayRemove { key, .. } => key,
        }
    }
}

/// Module-scoped commit primitive.
pub trait Commit: Send + Sync {
    fn commit(&self, mutation: Mutation);
}

impl<F> Commit for F
where
    F: Fn(Mutation) + Send + Sync,
{
    fn commit(&self, mutation: Mutation) {
        self(mutation)
    }
}
