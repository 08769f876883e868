use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("child snapshot has no key")]
    MissingKey,
    #[error("snapshot key is empty")]
    EmptyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown module {0:?}")]
    UnknownModule(String),
    #[error("unknown action {0:?}")]
    UnknownAction(String),
    #[error("state at module {0:?} is not an object")]
    NotAnObject(String),
    #[error("state key {0:?} is not an array")]
    NotAnArray(String),
    #[error("index {index} out of bounds for {key:?} (len {len})")]
    IndexOutOfBounds { key: String, index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("store rejected operation: {0}")]
    Store(#[from] StoreError),
}
