//! Named callable registry
//!
//! Work packages name their target callable and optional preflight hook
//! by string. The sandbox resolves those names against a [`Registry`]
//! compiled into the worker binary.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::package::PackedWorkPackage;

/// Target callable: positional and keyword arguments in, a value out
pub type Callable =
    Arc<dyn Fn(&[Value], &Map<String, Value>) -> anyhow::Result<Value> + Send + Sync>;

/// Hook run against the still-packed work package
pub type Preflight = Arc<dyn Fn(&PackedWorkPackage) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no callable registered as '{0}'")]
    UnknownCallable(String),

    #[error("no preflight hook registered as '{0}'")]
    UnknownPreflight(String),
}

/// Registry of callables and preflight hooks
#[derive(Clone, Default)]
pub struct Registry {
    callables: HashMap<String, Callable>,
    preflights: HashMap<String, Preflight>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable, replacing any previous one with that name
    pub fn register<F>(&mut self, name: impl Into<String>, callable: F) -> &mut Self
    where
        F: Fn(&[Value], &Map<String, Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.callables.insert(name.into(), Arc::new(callable));
        self
    }

    /// Registers a preflight hook
    pub fn register_preflight<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&PackedWorkPackage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.preflights.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn resolve_callable(&self, name: &str) -> Result<Callable, ResolveError> {
        self.callables
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownCallable(name.to_string()))
    }

    pub fn resolve_preflight(&self, name: &str) -> Result<Preflight, ResolveError> {
        self.preflights
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownPreflight(name.to_string()))
    }

    /// Registered callable names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("callables", &self.names())
            .field("preflights", &self.preflights.len())
            .finish()
    }
}
