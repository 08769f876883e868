use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::action::ActionContext;
use crate::error::BindError;

pub type ActionHandler<P> =
    Arc<dyn Fn(&ActionContext<P>, &P) -> Result<(), BindError> + Send + Sync>;

/// Definition of one store module: initial state, actions and nested
/// modules.
///
/// Actions of a namespaced module are registered as `"<name>/<action>"`;
/// actions of a plain module join their parent's namespace, so a single
/// dispatch can reach several modules.
pub struct Module<P> {
    pub(crate) state: Value,
    pub(crate) namespaced: bool,
    pub(crate) actions: Vec<(String, ActionHandler<P>)>,
    pub(crate) modules: Vec<(String, Module<P>)>,
}

impl<P> Default for Module<P> {
    fn default() -> Self {
        Self {
            state: Value::Object(Map::new()),
            namespaced: false,
            actions: Vec::new(),
            modules: Vec::new(),
        }
    }
}

impl<P> Module<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state; must be a JSON object.
    pub fn state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    pub fn action<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ActionContext<P>, &P) -> Result<(), BindError> + Send + Sync + 'static,
    {
        self.actions.push((name.into(), Arc::new(handler)));
        self
    }

    pub fn action_handler(mut self, name: impl Into<String>, handler: ActionHandler<P>) -> Self {
        self.actions.push((name.into(), handler));
        self
    }

    pub fn module(mut self, name: impl Into<String>, module: Module<P>) -> Self {
        self.modules.push((name.into(), module));
        self
    }
}

pub(crate) struct RegisteredAction<P> {
    pub(crate) module: Vec<String>,
    pub(crate) namespace: String,
    pub(crate) handler: ActionHandler<P>,
}

pub(crate) type ActionTable<P> = BTreeMap<String, Vec<RegisteredAction<P>>>;
