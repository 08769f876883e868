use std::fmt;

type CancelFn = Box<dyn FnOnce() + Send + Sync>;

/// Cancellation handle of one live binder.
///
/// `cancel` runs the binder's teardown at most once; dropping the handle
/// cancels it too.
pub struct BindingHandle {
    key: String,
    cancel: Option<CancelFn>,
}

impl BindingHandle {
    pub fn new<F>(key: impl Into<String>, cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for BindingHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for BindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingHandle")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}
