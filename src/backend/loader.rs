use std::sync::Arc;

use super::BackendLoader;
use super::BuiltinProvider;
use super::ViewModelProvider;
use crate::BackendConfig;
use crate::BackendError;

pub const BUILTIN_PROVIDER: &str = "builtin";

/// Picks the provider named by `backend.provider` in the configuration.
#[derive(Debug, Clone)]
pub struct ConfiguredLoader {
    config: BackendConfig,
}

impl ConfiguredLoader {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl BackendLoader for ConfiguredLoader {
    fn initialize(&self) -> std::result::Result<Arc<dyn ViewModelProvider>, BackendError> {
        match self.config.provider.as_str() {
            BUILTIN_PROVIDER => {
                let provider = BuiltinProvider::with_defaults().restrict_to(&self.config.enabled_types);
                if provider.type_names().is_empty() {
                    return Err(BackendError::InitFailed(format!(
                        "none of the enabled types {:?} is provided by '{}'",
                        self.config.enabled_types, BUILTIN_PROVIDER
                    )));
                }
                Ok(Arc::new(provider))
            }
            other => Err(BackendError::InitFailed(format!("unknown backend provider '{other}'"))),
        }
    }
}
