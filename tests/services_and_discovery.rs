use modhost::prelude::*;
use modhost::ServiceLifetime;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Database {
    pub url: String,
}

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

struct PoliteGreeter;

impl Greeter for PoliteGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Good day, {}", name)
    }
}

pub struct RequestContext {
    pub id: usize,
}

#[module(name = "Storage", description = "In-memory storage", priority = 10)]
#[derive(Default)]
struct StorageModule;

impl Module for StorageModule {
    fn configure_services(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        let url = ctx.configuration().get_or("database:url", "memory://");
        ctx.services_mut().add_instance(Database { url });
        Ok(())
    }
}

#[module(dependencies = [StorageModule])]
#[derive(Default)]
struct GreetingModule {
    greeting: Option<String>,
}

impl Module for GreetingModule {
    fn configure_services(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        // Not resolvable yet: the provider is built after every module configured
        assert!(ctx.try_service_provider().is_none());

        let counter = Arc::new(AtomicUsize::new(0));
        ctx.services_mut()
            .add_instance(PoliteGreeter)
            .bind::<dyn Greeter, PoliteGreeter, _>(|g| g as Arc<dyn Greeter>)
            .add_scoped(move |_| {
                Ok(RequestContext {
                    id: counter.fetch_add(1, Ordering::SeqCst),
                })
            });
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        let provider = ctx.service_provider()?;
        let db = provider.get_required_service::<Database>()?;
        let greeter = provider.get_trait::<dyn Greeter>()?;
        self.greeting = Some(greeter.greet(&db.url));
        ctx.set_property("greeting", self.greeting.clone().unwrap_or_default());
        Ok(())
    }
}

#[test]
fn test_services_registered_during_configure_resolve_during_initialize() {
    let config = Configuration::from_json(r#"{ "database": { "url": "postgres://db" } }"#).unwrap();

    let host = Host::builder()
        .configuration(config)
        .root_module::<GreetingModule>()
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        host.context().property::<String>("greeting").map(String::as_str),
        Some("Good day, postgres://db")
    );
    assert_eq!(
        host.get_required_service::<Database>().unwrap().url,
        "postgres://db"
    );
    assert!(host.get_trait::<dyn Greeter>().is_ok());

    let snapshot = host.context().modules();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].name, "Storage");
    assert_eq!(snapshot[0].description, "In-memory storage");
    assert_eq!(snapshot[1].name, "GreetingModule");
}

#[test]
fn test_scoped_services_through_host() {
    let host = Host::builder()
        .root_module::<GreetingModule>()
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        host.context().services().lifetime_of::<RequestContext>(),
        Some(ServiceLifetime::Scoped)
    );
    assert!(host.get_service::<RequestContext>().is_none());

    let first = host.create_scope();
    let second = host.create_scope();
    let a = first.get_required_service::<RequestContext>().unwrap();
    let a_again = first.get_required_service::<RequestContext>().unwrap();
    let b = second.get_required_service::<RequestContext>().unwrap();

    assert!(Arc::ptr_eq(&a, &a_again));
    assert_ne!(a.id, b.id);
}

#[test]
fn test_services_released_after_dispose() {
    let mut host = Host::builder()
        .services(|registry| {
            registry.add_instance(Database {
                url: "preregistered".into(),
            });
        })
        .build()
        .unwrap();

    assert!(host.modules().is_empty());
    assert!(host.get_service::<Database>().is_some());

    host.dispose();
    assert!(host.services().is_disposed());
    assert!(matches!(
        host.get_required_service::<Database>(),
        Err(ServiceError::ProviderDisposed { .. })
    ));
}

#[module(load_on_demand)]
#[derive(Default)]
struct Reporting;
impl Module for Reporting {}

#[module(dependencies = [Reporting], priority = -1)]
#[derive(Default)]
struct Dashboard;
impl Module for Dashboard {}

#[module(priority = 5)]
#[derive(Default)]
struct Metrics;
impl Module for Metrics {}

struct NotAModule;

#[test]
fn test_catalog_discovery_skips_on_demand_modules() {
    let catalog = ModuleCatalog::new()
        .with::<Metrics>()
        .with::<StorageModule>()
        .with::<Reporting>();
    let mut keys = catalog.module_keys();
    keys.push(ModuleKey::of_type::<NotAModule>());

    let host = Host::builder().add_modules_from(&keys).unwrap().build().unwrap();

    let names: Vec<&str> = host.modules().iter().map(|m| m.name()).collect();
    // Independent modules are ordered by priority
    assert_eq!(names, vec!["Storage", "Metrics"]);
}

#[test]
fn test_on_demand_module_loads_as_dependency() {
    let catalog = ModuleCatalog::new().with::<Dashboard>().with::<Reporting>();

    let host = Host::builder()
        .add_modules_from(&catalog)
        .unwrap()
        .build()
        .unwrap();

    let names: Vec<&str> = host.modules().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["Reporting", "Dashboard"]);
}

#[test]
fn test_on_demand_module_loads_explicitly() {
    let host = Host::builder()
        .load_module::<Reporting>()
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(host.modules().len(), 1);
    assert_eq!(
        host.modules()[0].state(),
        ModuleState::Initialized
    );
}

#[test]
fn test_transitive_dependencies_introspection() {
    let host = Host::builder()
        .root_module::<GreetingModule>()
        .unwrap()
        .build()
        .unwrap();

    let deps = host
        .lifecycle_manager()
        .transitive_dependencies(ModuleKey::of::<GreetingModule>());
    assert_eq!(deps.len(), 1);
    assert!(deps.contains(&ModuleKey::of::<StorageModule>()));
}

#[test]
fn test_explicit_load_of_non_module_is_rejected() {
    let mut manager = LifecycleManager::default();
    let err = manager.load(ModuleKey::of_type::<NotAModule>()).unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_invalid_declaration_fails_build() {
    struct Marker;

    #[derive(Default)]
    struct Broken;
    impl Module for Broken {}
    impl ModuleDefinition for Broken {
        fn metadata() -> ModuleMetadata {
            ModuleMetadata::for_type::<Self>().depends_on_key(ModuleKey::of_type::<Marker>())
        }
        fn create() -> Self {
            Broken
        }
    }

    let err = Host::builder().root_module::<Broken>().unwrap().build().unwrap_err();
    match err {
        LifecycleError::InvalidModuleDeclaration { module, dependency } => {
            assert_eq!(module, "Broken");
            assert!(dependency.ends_with("Marker"));
        }
        other => panic!("expected invalid declaration, got {}", other),
    }
}
