use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::counter;
use super::ViewModelHandle;
use super::ViewModelProvider;
use super::COUNTER_TYPE;
use crate::BackendError;

pub type ViewModelFactory = Arc<dyn Fn() -> Box<dyn ViewModelHandle> + Send + Sync>;

/// In-process provider backed by a table of factories.
#[derive(Default, Clone)]
pub struct BuiltinProvider {
    factories: HashMap<String, ViewModelFactory>,
}

impl fmt::Debug for BuiltinProvider {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("BuiltinProvider")
            .field("types", &self.type_names())
            .finish()
    }
}

impl BuiltinProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with every view-model shipped in this crate.
    pub fn with_defaults() -> Self {
        let mut provider = Self::new();
        provider.register(COUNTER_TYPE, || Box::new(counter()));
        provider
    }

    pub fn register<F>(
        &mut self,
        type_name: impl Into<String>,
        factory: F,
    ) where
        F: Fn() -> Box<dyn ViewModelHandle> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!(%type_name, "View-model factory registered");
        self.factories.insert(type_name, Arc::new(factory));
    }

    /// Drops every factory not named in `enabled`. An empty list keeps all.
    pub fn restrict_to(
        mut self,
        enabled: &[String],
    ) -> Self {
        if !enabled.is_empty() {
            self.factories.retain(|name, _| enabled.contains(name));
        }
        self
    }
}

impl ViewModelProvider for BuiltinProvider {
    fn create(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ViewModelHandle>, BackendError> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| BackendError::UnknownType(type_name.to_string()))?;
        Ok(factory())
    }

    fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
