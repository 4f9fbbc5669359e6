use resource_registry::resource::{
    DynResource, ProviderError, RegistrySettings, ResourceError, ResourceManager,
    ResourceProvider, ResourceRegistry, ResourceState, ResourceType,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn unique_settings(name: &str) -> RegistrySettings {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    RegistrySettings::default()
        .with_name(format!("{name}-{}", COUNTER.fetch_add(1, Ordering::SeqCst)))
        .with_destroy_on_drop(false)
}

type Journal = Arc<Mutex<Vec<String>>>;

trait Database: Send + Sync {
    fn dsn(&self) -> String;
}

struct Postgres {
    dsn: String,
}

impl Database for Postgres {
    fn dsn(&self) -> String {
        self.dsn.clone()
    }
}

/// Trait objects are stored behind an extra `Arc` so they can be downcast.
type SharedDatabase = Arc<dyn Database>;

struct DatabaseProvider {
    journal: Journal,
    dsn: Mutex<Option<String>>,
}

impl ResourceProvider for DatabaseProvider {
    fn configure(
        &self,
        _manager: &dyn ResourceManager,
        identifier: &str,
        args: &[Value],
    ) -> Result<(), ProviderError> {
        let host = args.first().and_then(Value::as_str).ok_or("missing host")?;
        let port = args.get(1).and_then(Value::as_u64).unwrap_or(5432);
        *self.dsn.lock().unwrap() = Some(format!("postgres://{host}:{port}"));
        self.journal.lock().unwrap().push(format!("open {identifier}"));
        Ok(())
    }

    fn supply(
        &self,
        _manager: &dyn ResourceManager,
        _identifier: &str,
    ) -> Result<DynResource, ProviderError> {
        let dsn = self.dsn.lock().unwrap().clone().ok_or("not configured")?;
        let database: SharedDatabase = Arc::new(Postgres { dsn });
        Ok(Arc::new(database) as DynResource)
    }

    fn destroy(&self, _manager: &dyn ResourceManager, identifier: &str) -> Result<(), ProviderError> {
        self.dsn.lock().unwrap().take();
        self.journal.lock().unwrap().push(format!("close {identifier}"));
        Ok(())
    }
}

struct Sessions {
    dsn: String,
    opened: AtomicUsize,
}

struct SessionProvider {
    journal: Journal,
    sessions: Mutex<Option<Arc<Sessions>>>,
}

impl ResourceProvider for SessionProvider {
    fn configure(
        &self,
        manager: &dyn ResourceManager,
        identifier: &str,
        _args: &[Value],
    ) -> Result<(), ProviderError> {
        let database = manager
            .get::<SharedDatabase>("database")
            .map_err(|err| ProviderError::new(err.to_string()))?;
        *self.sessions.lock().unwrap() = Some(Arc::new(Sessions {
            dsn: database.dsn(),
            opened: AtomicUsize::new(0),
        }));
        self.journal.lock().unwrap().push(format!("start {identifier}"));
        Ok(())
    }

    fn supply(
        &self,
        _manager: &dyn ResourceManager,
        _identifier: &str,
    ) -> Result<DynResource, ProviderError> {
        let sessions = self.sessions.lock().unwrap().clone().ok_or("not configured")?;
        sessions.opened.fetch_add(1, Ordering::SeqCst);
        Ok(sessions as DynResource)
    }

    fn destroy(&self, _manager: &dyn ResourceManager, identifier: &str) -> Result<(), ProviderError> {
        self.sessions.lock().unwrap().take();
        self.journal.lock().unwrap().push(format!("stop {identifier}"));
        Ok(())
    }
}

fn build_registry(journal: &Journal) -> ResourceRegistry {
    let registry = ResourceRegistry::with_settings(unique_settings("lifecycle"));
    registry
        .set_resource_provider(
            ResourceType::of::<Sessions>(),
            Arc::new(SessionProvider {
                journal: journal.clone(),
                sessions: Mutex::new(None),
            }),
            Vec::new(),
        )
        .expect("register sessions");
    registry
        .set_resource_provider(
            ResourceType::named::<SharedDatabase>("database"),
            Arc::new(DatabaseProvider {
                journal: journal.clone(),
                dsn: Mutex::new(None),
            }),
            vec![json!("db.internal"), json!(6432)],
        )
        .expect("register database");
    registry
        .set_resource_alias(ResourceType::named::<SharedDatabase>("primary"), "database")
        .expect("register alias");
    registry
}

#[test]
fn dependent_resources_are_torn_down_before_their_dependencies() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = build_registry(&journal);
    let sessions_id = std::any::type_name::<Sessions>();

    let sessions = registry.get::<Sessions>(sessions_id).expect("sessions");
    assert_eq!(sessions.dsn, "postgres://db.internal:6432");
    registry.get::<Sessions>(sessions_id).expect("sessions again");
    assert_eq!(sessions.opened.load(Ordering::SeqCst), 2);

    let primary = registry.get::<SharedDatabase>("primary").expect("primary");
    assert_eq!(primary.dsn(), "postgres://db.internal:6432");

    registry.destroy().expect("destroy");
    assert_eq!(
        journal.lock().unwrap().as_slice(),
        [
            "open database",
            format!("start {sessions_id}").as_str(),
            format!("stop {sessions_id}").as_str(),
            "close database",
        ]
    );
    assert!(!registry.has_resource("primary"));
    assert!(!registry.has_resource("database"));
}

#[test]
fn registration_order_does_not_decide_teardown_order() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = build_registry(&journal);

    registry.get_resource("database").expect("database");
    registry
        .get_resource(std::any::type_name::<Sessions>())
        .expect("sessions");

    assert_eq!(
        registry.identifiers(),
        [std::any::type_name::<Sessions>(), "database", "primary"]
    );
    assert_eq!(
        registry.teardown_order(),
        [std::any::type_name::<Sessions>(), "database"]
    );
}

#[test]
fn unrequested_providers_are_never_configured_or_destroyed() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = build_registry(&journal);

    assert_eq!(registry.resource_state("database"), Some(ResourceState::Pending));
    registry.destroy().expect("destroy");

    assert!(journal.lock().unwrap().is_empty());
    assert!(registry.is_empty());
}

#[test]
fn missing_configuration_arguments_surface_as_configuration_errors() {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let registry = ResourceRegistry::with_settings(unique_settings("args"));
    registry
        .set_resource_provider(
            ResourceType::named::<SharedDatabase>("database"),
            Arc::new(DatabaseProvider {
                journal: journal.clone(),
                dsn: Mutex::new(None),
            }),
            Vec::new(),
        )
        .expect("register database");

    let err = registry.get_resource("database").unwrap_err();
    assert_eq!(
        err,
        ResourceError::ConfigurationFailed {
            identifier: "database".into(),
            reason: "missing host".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "Failed to configure resource 'database': missing host"
    );
}

#[test]
fn settings_can_be_loaded_from_json() {
    let settings =
        RegistrySettings::from_json(r#"{"name":"from-json","destroyOnDrop":false}"#).expect("parse");
    let registry = ResourceRegistry::with_settings(settings);
    assert_eq!(registry.name(), "from-json");
    assert!(!registry.settings().destroy_on_drop);
    assert_eq!(ResourceRegistry::new().name(), "[DEFAULT]");
}
