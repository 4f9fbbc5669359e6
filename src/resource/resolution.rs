use std::cell::RefCell;
use std::sync::Arc;

use crate::resource::types::{ResourceError, ResourceResult};

thread_local! {
    static RESOLVING: RefCell<Vec<(usize, Arc<str>)>> = const { RefCell::new(Vec::new()) };
}

/// Marks an identifier as being resolved on this thread until dropped.
pub(crate) struct ResolutionGuard {
    registry: usize,
}

impl ResolutionGuard {
    pub(crate) fn enter(registry: usize, identifier: &str) -> ResourceResult<Self> {
        RESOLVING.with(|resolving| {
            let mut resolving = resolving.borrow_mut();
            let start = resolving
                .iter()
                .position(|(owner, id)| *owner == registry && **id == *identifier);
            if let Some(start) = start {
                let mut chain: Vec<String> = resolving[start..]
                    .iter()
                    .filter(|(owner, _)| *owner == registry)
                    .map(|(_, id)| id.to_string())
                    .collect();
                chain.push(identifier.to_string());
                return Err(ResourceError::CircularResolution { chain });
            }
            resolving.push((registry, Arc::from(identifier)));
            Ok(Self { registry })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|resolving| {
            let mut resolving = resolving.borrow_mut();
            if let Some(last) = resolving.iter().rposition(|(owner, _)| *owner == self.registry) {
                resolving.remove(last);
            }
        });
    }
}
