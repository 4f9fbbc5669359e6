use serde_json::Value;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A type-erased resource as stored by the registry.
pub type DynResource = Arc<dyn Any + Send + Sync>;

/// Arguments captured at registration and forwarded to a provider's configure step.
pub type ResourceArgs = Vec<Value>;

pub type ResourceResult<T> = Result<T, ResourceError>;

type TypeCheck = Arc<dyn Fn(&DynResource) -> bool + Send + Sync>;

/// Names an identifier and decides which resources satisfy it.
///
/// The name doubles as the registry key. A descriptor built with
/// [`ResourceType::of`] accepts exactly one concrete type, while
/// [`ResourceType::interface`] starts out accepting nothing and grows with
/// each [`ResourceType::implemented_by`] call, mirroring a trait or base type
/// that several concrete resources satisfy.
#[derive(Clone)]
pub struct ResourceType {
    name: Arc<str>,
    check: TypeCheck,
}

impl ResourceType {
    pub fn of<T>() -> Self
    where
        T: Any + Send + Sync,
    {
        Self::named::<T>(type_name::<T>())
    }

    /// Accepts exactly `T` under a caller-chosen name.
    pub fn named<T>(name: impl Into<String>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::with_check(name, |resource| (**resource).is::<T>())
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_check(name, |_| false)
    }

    pub fn with_check<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&DynResource) -> bool + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            check: Arc::new(check),
        }
    }

    pub fn implemented_by<T>(self) -> Self
    where
        T: Any + Send + Sync,
    {
        let previous = self.check;
        Self {
            name: self.name,
            check: Arc::new(move |resource| previous(resource) || (**resource).is::<T>()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, resource: &DynResource) -> bool {
        (self.check)(resource)
    }

    pub(crate) fn key(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

impl fmt::Debug for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceType").field(&self.name).finish()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Public view of an entry's lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Registered through a provider or factory that has not been configured yet.
    Pending,
    /// A long-lived provider that configured successfully and now supplies on demand.
    LiveProvider,
    /// A cached object, either set directly or produced by a factory.
    Object,
    /// Forwards resolution to another identifier.
    Alias,
}

/// Whether a provider stays live after configuration or is consumed once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Managed,
    SingleCall,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    DuplicateIdentifier { identifier: String },
    UnknownIdentifier { identifier: String },
    InvalidIdentifier { identifier: String },
    ConfigurationFailed { identifier: String, reason: String },
    SupplyFailed { identifier: String, reason: String },
    TypeMismatch { identifier: String, expected: String },
    UnrecognizedState { identifier: String },
    CleanupFailed { identifier: String, reason: String },
    CircularResolution { chain: Vec<String> },
}

impl ResourceError {
    /// The identifier the failure is about; for cycles, the one that closed the loop.
    pub fn identifier(&self) -> &str {
        match self {
            ResourceError::DuplicateIdentifier { identifier }
            | ResourceError::UnknownIdentifier { identifier }
            | ResourceError::InvalidIdentifier { identifier }
            | ResourceError::ConfigurationFailed { identifier, .. }
            | ResourceError::SupplyFailed { identifier, .. }
            | ResourceError::TypeMismatch { identifier, .. }
            | ResourceError::UnrecognizedState { identifier }
            | ResourceError::CleanupFailed { identifier, .. } => identifier,
            ResourceError::CircularResolution { chain } => {
                chain.last().map(String::as_str).unwrap_or_default()
            }
        }
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::DuplicateIdentifier { identifier } => {
                write!(f, "The resource '{identifier}' already exists")
            }
            ResourceError::UnknownIdentifier { identifier } => {
                write!(f, "Could not find any resource matching '{identifier}'")
            }
            ResourceError::InvalidIdentifier { identifier } => {
                write!(f, "Illegal resource identifier: '{identifier}'")
            }
            ResourceError::ConfigurationFailed { identifier, reason } => {
                write!(f, "Failed to configure resource '{identifier}': {reason}")
            }
            ResourceError::SupplyFailed { identifier, reason } => {
                write!(f, "Provider for '{identifier}' could not supply a resource: {reason}")
            }
            ResourceError::TypeMismatch {
                identifier,
                expected,
            } => write!(
                f,
                "The resource provided for '{identifier}' does not match the requested type {expected}"
            ),
            ResourceError::UnrecognizedState { identifier } => {
                write!(f, "Failed to identify the resource state of '{identifier}'")
            }
            ResourceError::CleanupFailed { identifier, reason } => {
                write!(f, "Failed to cleanup resource '{identifier}': {reason}")
            }
            ResourceError::CircularResolution { chain } => {
                write!(f, "Circular resource resolution: {}", chain.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ResourceError {}
