mod entry;
mod resolution;

pub mod constants;
pub mod logger;
pub mod manager;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod types;

pub use constants::DEFAULT_REGISTRY_NAME;
pub use manager::ResourceManager;
pub use provider::{FactoryFn, FactoryProvider, ProviderError, ResourceProvider};
pub use registry::ResourceRegistry;
pub use settings::RegistrySettings;
pub use types::{
    DynResource, Lifecycle, ResourceArgs, ResourceError, ResourceResult, ResourceState,
    ResourceType,
};
