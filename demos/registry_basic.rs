use std::error::Error;
use std::sync::{Arc, Mutex};

use resource_registry::logger::{set_log_level, LogLevel};
use resource_registry::resource::{
    DynResource, ProviderError, RegistrySettings, ResourceManager, ResourceProvider,
    ResourceRegistry, ResourceType,
};
use serde_json::{json, Value};

struct Config {
    greeting: String,
}

struct Journal {
    path: String,
    lines: Mutex<Vec<String>>,
}

#[derive(Default)]
struct JournalProvider {
    journal: Mutex<Option<Arc<Journal>>>,
}

impl ResourceProvider for JournalProvider {
    fn configure(
        &self,
        manager: &dyn ResourceManager,
        _identifier: &str,
        args: &[Value],
    ) -> Result<(), ProviderError> {
        let config = manager
            .get::<Config>("config")
            .map_err(|err| ProviderError::new(err.to_string()))?;
        let path = args.first().and_then(Value::as_str).unwrap_or("journal.log");
        let journal = Journal {
            path: path.to_string(),
            lines: Mutex::new(vec![config.greeting.clone()]),
        };
        *self.journal.lock().unwrap() = Some(Arc::new(journal));
        Ok(())
    }

    fn supply(
        &self,
        _manager: &dyn ResourceManager,
        _identifier: &str,
    ) -> Result<DynResource, ProviderError> {
        let journal = self.journal.lock().unwrap().clone().ok_or("journal not open")?;
        Ok(journal as DynResource)
    }

    fn destroy(&self, _manager: &dyn ResourceManager, _identifier: &str) -> Result<(), ProviderError> {
        if let Some(journal) = self.journal.lock().unwrap().take() {
            let lines = journal.lines.lock().unwrap();
            println!("flushing {} line(s) to {}", lines.len(), journal.path);
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    set_log_level(LogLevel::Debug)?;

    let registry = ResourceRegistry::with_settings(RegistrySettings::default().with_name("demo"));

    registry.set_resource_factory(
        ResourceType::named::<Config>("config"),
        vec![json!("hello from the registry")],
        |_manager, _identifier, args| {
            let greeting = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(Arc::new(Config {
                greeting: greeting.to_string(),
            }) as DynResource)
        },
    )?;
    registry.set_resource_provider(
        ResourceType::named::<Journal>("journal"),
        Arc::new(JournalProvider::default()),
        vec![json!("/tmp/demo-journal.log")],
    )?;
    registry.set_resource_alias(ResourceType::named::<Journal>("log"), "journal")?;

    let journal = registry.get::<Journal>("log")?;
    journal.lines.lock().unwrap().push("second line".to_string());
    println!("journal at {} with state {:?}", journal.path, registry.resource_state("journal"));

    registry.destroy()?;
    println!("registry empty after destroy: {}", registry.is_empty());
    Ok(())
}
