use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::resource::{DynResource, ProviderError, ResourceManager, ResourceProvider};

/// Shared, ordered record of provider callbacks such as `"configure:db"`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Simple resource handed out by [`RecordingProvider`].
#[derive(Debug, PartialEq, Eq)]
pub struct Widget {
    pub label: String,
    pub serial: usize,
}

/// Provider that appends every callback to a [`CallLog`] and can be told to fail.
pub struct RecordingProvider {
    log: CallLog,
    serial: AtomicUsize,
    fail_configure: AtomicBool,
    fail_supply: AtomicBool,
    fail_destroy: AtomicBool,
    last_args: Mutex<Vec<Value>>,
}

impl RecordingProvider {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: Arc::clone(log),
            serial: AtomicUsize::new(0),
            fail_configure: AtomicBool::new(false),
            fail_supply: AtomicBool::new(false),
            fail_destroy: AtomicBool::new(false),
            last_args: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_configure(self) -> Self {
        self.fail_configure.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_supply(self) -> Self {
        self.fail_supply.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_destroy(self) -> Self {
        self.fail_destroy.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_configure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_destroy(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    pub fn last_args(&self) -> Vec<Value> {
        self.last_args.lock().unwrap().clone()
    }

    fn record(&self, call: &str, identifier: &str) {
        self.log.lock().unwrap().push(format!("{call}:{identifier}"));
    }
}

impl ResourceProvider for RecordingProvider {
    fn configure(
        &self,
        _manager: &dyn ResourceManager,
        identifier: &str,
        args: &[Value],
    ) -> Result<(), ProviderError> {
        self.record("configure", identifier);
        *self.last_args.lock().unwrap() = args.to_vec();
        if self.fail_configure.load(Ordering::SeqCst) {
            return Err(ProviderError::new("configure refused"));
        }
        Ok(())
    }

    fn supply(
        &self,
        _manager: &dyn ResourceManager,
        identifier: &str,
    ) -> Result<DynResource, ProviderError> {
        self.record("supply", identifier);
        if self.fail_supply.load(Ordering::SeqCst) {
            return Err(ProviderError::new("supply refused"));
        }
        let serial = self.serial.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Widget {
            label: identifier.to_string(),
            serial,
        }) as DynResource)
    }

    fn destroy(&self, _manager: &dyn ResourceManager, identifier: &str) -> Result<(), ProviderError> {
        self.record("destroy", identifier);
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(ProviderError::new("destroy refused"));
        }
        Ok(())
    }
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
