use std::fmt;
use std::sync::Arc;

/// Names of the synthetic fields added to bound records.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RecordFormat {
    pub key_field: String,
    pub value_field: String,
}

impl RecordFormat {
    pub fn new(key_field: impl Into<String>, value_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            value_field: value_field.into(),
        }
    }
}

impl Default for RecordFormat {
    fn default() -> Self {
        Self::new(".key", ".value")
    }
}

/// How array binders report mirror changes to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ArrayCommitStyle {
    /// One `SET_VALUE` with the whole array per change.
    #[default]
    Replace,
    /// `ARRAY_INSERT` / `ARRAY_CHANGE` / `ARRAY_REMOVE` for single-position
    /// edits, `SET_VALUE` otherwise.
    Incremental,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    pub record_format: RecordFormat,
    pub array_commits: ArrayCommitStyle,
}

pub type ReadyCallback = Arc<dyn Fn() + Send + Sync>;

/// Per-binding options.
#[derive(Clone, Default)]
pub struct BindOptions {
    /// Array bindings only: keep the state untouched until the initial
    /// snapshot has been fully received, then set it in one commit.
    pub wait: bool,
    /// Called once when the initial data has been applied.
    pub on_ready: Option<ReadyCallback>,
}

impl BindOptions {
    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn on_ready<F>(mut self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_ready = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for BindOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("wait", &self.wait)
            .field("on_ready", &self.on_ready.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let format = RecordFormat::default();
        assert_eq!(format.key_field, ".key");
        assert_eq!(format.value_field, ".value");
        assert_eq!(StoreConfig::default().array_commits, ArrayCommitStyle::Replace);
        assert!(!BindOptions::default().wait);
    }

    #[test]
    fn options_builder() {
        let options = BindOptions::default().wait(true).on_ready(|| {});
        assert!(options.wait);
        assert!(options.on_ready.is_some());
        assert_eq!(format!("{options:?}"), "BindOptions { wait: true, on_ready: true }");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn store_config_from_json() {
        let config: StoreConfig = serde_json::from_value(serde_json::json!({
            "array_commits": "incremental",
            "record_format": {"key_field": "id"}
        }))
        .unwrap();
        assert_eq!(config.array_commits, ArrayCommitStyle::Incremental);
        assert_eq!(config.record_format, RecordFormat::new("id", ".value"));
    }
}
