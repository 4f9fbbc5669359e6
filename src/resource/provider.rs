use serde_json::Value;
use std::fmt;
use std::sync::Mutex;

use crate::resource::manager::ResourceManager;
use crate::resource::types::{DynResource, Lifecycle};

/// Failure reported by provider or factory code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Supplies a resource whose setup is deferred until it is first requested.
///
/// The registry calls [`configure`](Self::configure) once, on the first
/// request, with the arguments captured at registration. After that every
/// request calls [`supply`](Self::supply); the registry does not cache its
/// result, so a provider may hand out a shared instance or a fresh one per
/// call. [`destroy`](Self::destroy) runs once during registry teardown and
/// only if configuration succeeded.
///
/// Each call receives the registry as a [`ResourceManager`], so a provider
/// can request the resources it depends on while configuring.
pub trait ResourceProvider: Send + Sync {
    fn configure(
        &self,
        manager: &dyn ResourceManager,
        identifier: &str,
        args: &[Value],
    ) -> Result<(), ProviderError>;

    fn supply(
        &self,
        manager: &dyn ResourceManager,
        identifier: &str,
    ) -> Result<DynResource, ProviderError>;

    fn destroy(&self, manager: &dyn ResourceManager, identifier: &str)
        -> Result<(), ProviderError>;

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::Managed
    }
}

pub type FactoryFn = Box<
    dyn Fn(&dyn ResourceManager, &str, &[Value]) -> Result<DynResource, ProviderError>
        + Send
        + Sync,
>;

/// Adapts a single-call factory to [`ResourceProvider`].
///
/// The factory runs during configure and its result is handed over by the
/// following supply; the registry then caches it as a plain object. There is
/// nothing to tear down.
pub struct FactoryProvider {
    factory: FactoryFn,
    produced: Mutex<Option<DynResource>>,
}

impl FactoryProvider {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&dyn ResourceManager, &str, &[Value]) -> Result<DynResource, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            factory: Box::new(factory),
            produced: Mutex::new(None),
        }
    }
}

impl fmt::Debug for FactoryProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryProvider").finish_non_exhaustive()
    }
}

impl ResourceProvider for FactoryProvider {
    fn configure(
        &self,
        manager: &dyn ResourceManager,
        identifier: &str,
        args: &[Value],
    ) -> Result<(), ProviderError> {
        let resource = (self.factory)(manager, identifier, args)?;
        *self
            .produced
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(resource);
        Ok(())
    }

    fn supply(
        &self,
        _manager: &dyn ResourceManager,
        identifier: &str,
    ) -> Result<DynResource, ProviderError> {
        self.produced
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take()
            .ok_or_else(|| ProviderError::new(format!("factory for '{identifier}' produced nothing")))
    }

    fn destroy(
        &self,
        _manager: &dyn ResourceManager,
        _identifier: &str,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::SingleCall
    }
}
