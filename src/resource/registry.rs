use indexmap::IndexMap;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::resource::entry::{Entry, EntryState};
use crate::resource::logger::LOGGER;
use crate::resource::manager::{downcast_resource, ResourceManager};
use crate::resource::provider::{FactoryProvider, ProviderError, ResourceProvider};
use crate::resource::resolution::ResolutionGuard;
use crate::resource::settings::RegistrySettings;
use crate::resource::types::{
    DynResource, Lifecycle, ResourceArgs, ResourceError, ResourceResult, ResourceState,
    ResourceType,
};

static NEXT_REGISTRY_ID: AtomicUsize = AtomicUsize::new(1);

/// Maps identifiers to lazily created, type-checked singletons.
///
/// Resources enter the registry in one of three ways: as a ready object
/// ([`set_resource`](Self::set_resource)), through a provider or factory that
/// runs on first request ([`set_resource_provider`](Self::set_resource_provider),
/// [`set_resource_factory`](Self::set_resource_factory)), or as an alias of
/// another identifier ([`set_resource_alias`](Self::set_resource_alias)).
/// Every value handed out is checked against the [`ResourceType`] of the
/// identifier it was requested under.
///
/// [`destroy`](Self::destroy) tears down live providers in the reverse order
/// of their first successful configuration and then empties the registry.
///
/// ```
/// use resource_registry::resource::{DynResource, ResourceRegistry, ResourceType};
/// use std::sync::Arc;
///
/// struct Clock(u64);
///
/// let registry = ResourceRegistry::new();
/// registry
///     .set_resource_factory(ResourceType::of::<Clock>(), Vec::new(), |_, _, _| {
///         Ok(Arc::new(Clock(42)) as DynResource)
///     })
///     .unwrap();
///
/// let clock = registry.get::<Clock>(std::any::type_name::<Clock>()).unwrap();
/// assert_eq!(clock.0, 42);
/// ```
pub struct ResourceRegistry {
    id: usize,
    settings: RegistrySettings,
    entries: Mutex<IndexMap<Arc<str>, Entry>>,
    teardown: Mutex<Vec<Arc<str>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::with_settings(RegistrySettings::default())
    }

    pub fn with_settings(settings: RegistrySettings) -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            settings,
            entries: Mutex::new(IndexMap::new()),
            teardown: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.settings.resolved_name()
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    /// Points `alias` at an already registered identifier.
    ///
    /// The alias is not type-checked here; the check happens when a request
    /// through the alias resolves to a concrete object.
    pub fn set_resource_alias(&self, alias: ResourceType, target: &str) -> ResourceResult<()> {
        ensure_valid(&alias)?;
        let mut entries = self.entries();
        let Some((target, _)) = entries.get_key_value(target) else {
            return Err(ResourceError::UnknownIdentifier {
                identifier: target.to_string(),
            });
        };
        let target = Arc::clone(target);
        if entries.contains_key(alias.name()) {
            return Err(duplicate(&alias));
        }

        LOGGER.debug(format!(
            "Registry {}: aliasing '{}' to '{}'",
            self.name(),
            alias,
            target
        ));
        entries.insert(alias.key(), Entry::new(alias, EntryState::Alias { target }));
        Ok(())
    }

    /// Registers a provider that is configured with `args` on first request.
    pub fn set_resource_provider(
        &self,
        ty: ResourceType,
        provider: Arc<dyn ResourceProvider>,
        args: ResourceArgs,
    ) -> ResourceResult<()> {
        ensure_valid(&ty)?;
        let mut entries = self.entries();
        if entries.contains_key(ty.name()) {
            return Err(duplicate(&ty));
        }

        LOGGER.debug(format!(
            "Registry {}: registered {:?} provider for '{}'",
            self.name(),
            provider.lifecycle(),
            ty
        ));
        let state = EntryState::Pending {
            provider,
            args: Arc::from(args),
        };
        entries.insert(ty.key(), Entry::new(ty, state));
        Ok(())
    }

    /// Registers a closure that runs once, on first request; its result is cached.
    pub fn set_resource_factory<F>(
        &self,
        ty: ResourceType,
        args: ResourceArgs,
        factory: F,
    ) -> ResourceResult<()>
    where
        F: Fn(&dyn ResourceManager, &str, &[Value]) -> Result<DynResource, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.set_resource_provider(ty, Arc::new(FactoryProvider::new(factory)), args)
    }

    /// Registers a ready object. It must satisfy `ty`.
    pub fn set_resource(&self, ty: ResourceType, resource: DynResource) -> ResourceResult<()> {
        ensure_valid(&ty)?;
        if !ty.matches(&resource) {
            return Err(ResourceError::TypeMismatch {
                identifier: ty.name().to_string(),
                expected: ty.name().to_string(),
            });
        }

        let mut entries = self.entries();
        if entries.contains_key(ty.name()) {
            return Err(duplicate(&ty));
        }

        LOGGER.debug(format!("Registry {}: stored object for '{}'", self.name(), ty));
        entries.insert(ty.key(), Entry::new(ty, EntryState::Object { value: resource }));
        Ok(())
    }

    pub fn has_resource(&self, identifier: &str) -> bool {
        self.entries().contains_key(identifier)
    }

    /// Resolves `identifier`, configuring its provider if this is the first request.
    pub fn get_resource(&self, identifier: &str) -> ResourceResult<DynResource> {
        let _guard = ResolutionGuard::enter(self.id, identifier)?;
        let (ty, state) = self.snapshot(identifier)?;

        let resource = match state {
            EntryState::Alias { target } => self.get_resource(&target)?,
            EntryState::Object { value } => value,
            EntryState::LiveProvider { provider, .. } => self.supply(&provider, identifier)?,
            EntryState::Pending { .. } => self.configure(identifier)?,
        };

        if !ty.matches(&resource) {
            return Err(ResourceError::TypeMismatch {
                identifier: identifier.to_string(),
                expected: ty.name().to_string(),
            });
        }
        Ok(resource)
    }

    /// Resolves `identifier` and downcasts the result to `T`.
    pub fn get<T>(&self, identifier: &str) -> ResourceResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        downcast_resource(identifier, self.get_resource(identifier)?)
    }

    /// Tears down every live provider, newest first, then clears the registry.
    ///
    /// If a provider fails to destroy, teardown stops with
    /// [`ResourceError::CleanupFailed`]. That identifier goes back on top of
    /// the teardown stack and the registry keeps its entries, so `destroy`
    /// can be called again once the cause is dealt with. Providers that were
    /// already destroyed are back in [`ResourceState::Pending`] and are not
    /// destroyed a second time.
    pub fn destroy(&self) -> ResourceResult<()> {
        loop {
            let Some(identifier) = self.teardown().pop() else {
                break;
            };

            let live = match self.entries().get(&*identifier).map(|e| &e.state) {
                Some(EntryState::LiveProvider { provider, args }) => {
                    Some((Arc::clone(provider), Arc::clone(args)))
                }
                _ => None,
            };
            let Some((provider, args)) = live else {
                return Err(ResourceError::UnrecognizedState {
                    identifier: identifier.to_string(),
                });
            };

            if let Err(err) = provider.destroy(self, &identifier) {
                LOGGER.warn(format!(
                    "Registry {}: failed to cleanup '{}': {}",
                    self.name(),
                    identifier,
                    err
                ));
                self.teardown().push(Arc::clone(&identifier));
                return Err(ResourceError::CleanupFailed {
                    identifier: identifier.to_string(),
                    reason: err.to_string(),
                });
            }

            LOGGER.debug(format!("Registry {}: destroyed '{}'", self.name(), identifier));
            self.transition(&identifier, EntryState::Pending { provider, args })?;
        }

        let mut entries = self.entries();
        LOGGER.debug(format!(
            "Registry {}: clearing {} resource(s)",
            self.name(),
            entries.len()
        ));
        entries.clear();
        Ok(())
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> Vec<String> {
        self.entries().keys().map(|key| key.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn resource_state(&self, identifier: &str) -> Option<ResourceState> {
        self.entries()
            .get(identifier)
            .map(|entry| entry.state.kind())
    }

    /// Live providers in the order [`destroy`](Self::destroy) would tear them down.
    pub fn teardown_order(&self) -> Vec<String> {
        self.teardown()
            .iter()
            .rev()
            .map(|identifier| identifier.to_string())
            .collect()
    }

    fn configure(&self, identifier: &str) -> ResourceResult<DynResource> {
        let gate = self.gate(identifier)?;
        let _configuring = gate.lock().unwrap_or_else(|poison| poison.into_inner());

        // another thread may have finished configuring while we waited on the gate
        let (provider, args) = match self.snapshot(identifier)?.1 {
            EntryState::Pending { provider, args } => (provider, args),
            EntryState::Object { value } => return Ok(value),
            EntryState::LiveProvider { provider, .. } => return self.supply(&provider, identifier),
            EntryState::Alias { .. } => {
                return Err(ResourceError::UnrecognizedState {
                    identifier: identifier.to_string(),
                })
            }
        };

        LOGGER.debug(format!("Registry {}: configuring '{}'", self.name(), identifier));
        provider
            .configure(self, identifier, &args)
            .map_err(|err| ResourceError::ConfigurationFailed {
                identifier: identifier.to_string(),
                reason: err.to_string(),
            })?;

        match provider.lifecycle() {
            Lifecycle::Managed => {
                self.transition(
                    identifier,
                    EntryState::LiveProvider {
                        provider: Arc::clone(&provider),
                        args,
                    },
                )?;
                self.teardown().push(Arc::from(identifier));
                self.supply(&provider, identifier)
            }
            Lifecycle::SingleCall => {
                let value = provider.supply(self, identifier).map_err(|err| {
                    ResourceError::ConfigurationFailed {
                        identifier: identifier.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                self.transition(
                    identifier,
                    EntryState::Object {
                        value: Arc::clone(&value),
                    },
                )?;
                LOGGER.debug(format!("Registry {}: cached '{}'", self.name(), identifier));
                Ok(value)
            }
        }
    }

    fn supply(
        &self,
        provider: &Arc<dyn ResourceProvider>,
        identifier: &str,
    ) -> ResourceResult<DynResource> {
        provider
            .supply(self, identifier)
            .map_err(|err| ResourceError::SupplyFailed {
                identifier: identifier.to_string(),
                reason: err.to_string(),
            })
    }

    fn snapshot(&self, identifier: &str) -> ResourceResult<(ResourceType, EntryState)> {
        self.entries()
            .get(identifier)
            .map(|entry| (entry.ty.clone(), entry.state.clone()))
            .ok_or_else(|| unknown(identifier))
    }

    fn gate(&self, identifier: &str) -> ResourceResult<Arc<Mutex<()>>> {
        self.entries()
            .get(identifier)
            .map(|entry| Arc::clone(&entry.gate))
            .ok_or_else(|| unknown(identifier))
    }

    fn transition(&self, identifier: &str, state: EntryState) -> ResourceResult<()> {
        let mut entries = self.entries();
        let entry = entries
            .get_mut(identifier)
            .ok_or_else(|| unknown(identifier))?;
        entry.state = state;
        Ok(())
    }

    fn entries(&self) -> MutexGuard<'_, IndexMap<Arc<str>, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn teardown(&self) -> MutexGuard<'_, Vec<Arc<str>>> {
        self.teardown
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManager for ResourceRegistry {
    fn has_resource(&self, identifier: &str) -> bool {
        ResourceRegistry::has_resource(self, identifier)
    }

    fn get_resource(&self, identifier: &str) -> ResourceResult<DynResource> {
        ResourceRegistry::get_resource(self, identifier)
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("name", &self.name())
            .field("identifiers", &self.identifiers())
            .field("teardown_order", &self.teardown_order())
            .finish()
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        if !self.settings.destroy_on_drop || self.teardown().is_empty() {
            return;
        }
        if let Err(err) = self.destroy() {
            LOGGER.error(format!(
                "Registry {} dropped with live resources: {}",
                self.name(),
                err
            ));
        }
    }
}

fn ensure_valid(ty: &ResourceType) -> ResourceResult<()> {
    if ty.name().is_empty() {
        return Err(ResourceError::InvalidIdentifier {
            identifier: String::new(),
        });
    }
    Ok(())
}

fn duplicate(ty: &ResourceType) -> ResourceError {
    ResourceError::DuplicateIdentifier {
        identifier: ty.name().to_string(),
    }
}

fn unknown(identifier: &str) -> ResourceError {
    ResourceError::UnknownIdentifier {
        identifier: identifier.to_string(),
    }
}
