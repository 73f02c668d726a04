use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::error;
use tracing::info;

use super::BackendLoader;
use super::ViewModelHandle;
use super::ViewModelProvider;
use crate::BackendError;
use crate::BrokerError;

/// Lazily-initialized provider shared by the whole broker.
///
/// `initialize()` on the loader runs on the first [`create_instance`] call and
/// never again, whatever its outcome.
///
/// [`create_instance`]: BackendBinding::create_instance
pub struct BackendBinding {
    loader: Box<dyn BackendLoader>,
    provider: OnceCell<std::result::Result<Arc<dyn ViewModelProvider>, String>>,
}

impl fmt::Debug for BackendBinding {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("BackendBinding")
            .field("initialized", &self.provider.get().is_some())
            .finish_non_exhaustive()
    }
}

impl BackendBinding {
    pub fn new(loader: impl BackendLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            provider: OnceCell::new(),
        }
    }

    /// Binding whose provider is already loaded.
    pub fn with_provider(provider: Arc<dyn ViewModelProvider>) -> Self {
        let binding = Self::new(PreloadedLoader(provider.clone()));
        let _ = binding.provider.set(Ok(provider));
        binding
    }

    pub fn is_initialized(&self) -> bool {
        self.provider.get().is_some()
    }

    /// Returns the provider, loading it on first use.
    pub fn provider(&self) -> std::result::Result<Arc<dyn ViewModelProvider>, BrokerError> {
        let outcome = self.provider.get_or_init(|| match self.loader.initialize() {
            Ok(provider) => {
                info!(types = ?provider.type_names(), "Backend provider loaded");
                Ok(provider)
            }
            Err(e) => {
                error!("Failed to load backend provider: {}", e);
                Err(e.to_string())
            }
        });

        outcome.clone().map_err(BrokerError::BackendUnavailable)
    }

    pub fn create_instance(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ViewModelHandle>, BrokerError> {
        let provider = self.provider()?;
        provider.create(type_name).map_err(|e| match e {
            BackendError::UnknownType(name) => BrokerError::UnknownType(name),
            BackendError::InitFailed(msg) => BrokerError::BackendUnavailable(msg),
            other => BrokerError::BackendUnavailable(other.to_string()),
        })
    }
}

struct PreloadedLoader(Arc<dyn ViewModelProvider>);

impl BackendLoader for PreloadedLoader {
    fn initialize(&self) -> std::result::Result<Arc<dyn ViewModelProvider>, BackendError> {
        Ok(self.0.clone())
    }
}
