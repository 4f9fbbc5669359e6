use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::resource::provider::ResourceProvider;
use crate::resource::types::{DynResource, ResourceState, ResourceType};

#[derive(Clone)]
pub(crate) enum EntryState {
    Pending {
        provider: Arc<dyn ResourceProvider>,
        args: Arc<[Value]>,
    },
    // args are kept so teardown can put the entry back to Pending
    LiveProvider {
        provider: Arc<dyn ResourceProvider>,
        args: Arc<[Value]>,
    },
    Object {
        value: DynResource,
    },
    Alias {
        target: Arc<str>,
    },
}

impl EntryState {
    pub(crate) fn kind(&self) -> ResourceState {
        match self {
            EntryState::Pending { .. } => ResourceState::Pending,
            EntryState::LiveProvider { .. } => ResourceState::LiveProvider,
            EntryState::Object { .. } => ResourceState::Object,
            EntryState::Alias { .. } => ResourceState::Alias,
        }
    }
}

pub(crate) struct Entry {
    pub ty: ResourceType,
    pub state: EntryState,
    /// Held for the whole configure step so an identifier is configured once.
    pub gate: Arc<Mutex<()>>,
}

impl Entry {
    pub(crate) fn new(ty: ResourceType, state: EntryState) -> Self {
        Self {
            ty,
            state,
            gate: Arc::new(Mutex::new(())),
        }
    }
}
