use std::any::{type_name, Any};
use std::sync::Arc;

use crate::resource::types::{DynResource, ResourceError, ResourceResult};

/// Read access to a registry, as seen by providers and factories.
pub trait ResourceManager: Send + Sync {
    fn has_resource(&self, identifier: &str) -> bool;

    fn get_resource(&self, identifier: &str) -> ResourceResult<DynResource>;
}

impl<'a> dyn ResourceManager + 'a {
    /// Resolves `identifier` and downcasts it to `T`.
    pub fn get<T>(&self, identifier: &str) -> ResourceResult<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        downcast_resource(identifier, self.get_resource(identifier)?)
    }
}

pub(crate) fn downcast_resource<T>(identifier: &str, resource: DynResource) -> ResourceResult<Arc<T>>
where
    T: Any + Send + Sync,
{
    resource
        .downcast::<T>()
        .map_err(|_| ResourceError::TypeMismatch {
            identifier: identifier.to_string(),
            expected: type_name::<T>().to_string(),
        })
}
