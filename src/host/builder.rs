use super::Host;
use crate::config::Configuration;
use crate::di::ServiceRegistry;
use crate::lifecycle::{LifecycleError, LifecycleManager, ModuleContext, PRODUCTION, Result};
use crate::module::{ModuleDefinition, ModuleKey, ModuleSource};
use std::any::Any;
use std::sync::Arc;

/// Environment variable consulted when no environment name is set explicitly
pub const ENVIRONMENT_VARIABLE: &str = "MODHOST_ENVIRONMENT";

/// Builder for [`Host`]
///
/// Accumulates the service registry, configuration, environment name and
/// the root module declaration. `build` configures and initializes every
/// loaded module exactly once.
///
/// # Example
///
/// ```rust,ignore
/// use modhost::Host;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut host = Host::builder()
///         .environment("Development")
///         .root_module::<AppModule>()?
///         .build()?;
///
///     // Run the application...
///
///     host.dispose();
///     Ok(())
/// }
/// ```
pub struct HostBuilder {
    manager: LifecycleManager,
    root_module: Option<ModuleKey>,
    environment: Option<String>,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBuilder {
    /// Create a new host builder
    pub fn new() -> Self {
        let context = ModuleContext::new(ServiceRegistry::new(), Configuration::new(), PRODUCTION);
        Self {
            manager: LifecycleManager::new(context),
            root_module: None,
            environment: None,
        }
    }

    /// Set the environment name (e.g. `Development`, `Production`)
    pub fn environment(mut self, name: impl Into<String>) -> Self {
        self.environment = Some(name.into());
        self
    }

    /// Replace the configuration
    pub fn configuration(mut self, configuration: Configuration) -> Self {
        self.manager.context_mut().set_configuration(configuration);
        self
    }

    /// Adjust the configuration in place
    pub fn configure<F>(self, configure: F) -> Self
    where
        F: FnOnce(&Configuration),
    {
        configure(self.manager.context().configuration());
        self
    }

    /// Register services before any module is configured
    pub fn services<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut ServiceRegistry),
    {
        register(self.manager.context_mut().services_mut());
        self
    }

    /// Seed the context's property bag before any module runs
    pub fn property<T: Any + Send>(mut self, key: impl Into<String>, value: T) -> Self {
        self.manager.context_mut().set_property(key, value);
        self
    }

    /// Declare the root module; its dependencies are loaded recursively.
    ///
    /// # Errors
    ///
    /// Only one root module may be declared per build.
    pub fn root_module<M: ModuleDefinition>(mut self) -> Result<Self> {
        if let Some(existing) = self.root_module {
            return Err(LifecycleError::RootModuleAlreadyDeclared {
                existing: existing.type_name().to_string(),
            });
        }
        let key = ModuleKey::of::<M>();
        self.manager.load(key)?;
        self.root_module = Some(key);
        Ok(self)
    }

    /// Load a module explicitly, including one flagged load-on-demand
    pub fn load_module<M: ModuleDefinition>(mut self) -> Result<Self> {
        self.manager.load_module::<M>()?;
        Ok(self)
    }

    /// Load every module from `source` that is not flagged load-on-demand
    pub fn add_modules_from<S: ModuleSource + ?Sized>(mut self, source: &S) -> Result<Self> {
        self.manager.load_from_source(source)?;
        Ok(self)
    }

    pub fn root_module_key(&self) -> Option<ModuleKey> {
        self.root_module
    }

    /// Build and start the host
    ///
    /// This will:
    /// 1. Run ConfigureServices on every module in resolved order
    /// 2. Build the service provider from the registry
    /// 3. Run Initialize on every module in resolved order
    ///
    /// If a module fails to initialize, the modules that already initialized
    /// are shut down before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution or any startup callback fails.
    pub fn build(mut self) -> Result<Host> {
        let environment = self
            .environment
            .take()
            .or_else(|| std::env::var(ENVIRONMENT_VARIABLE).ok())
            .unwrap_or_else(|| PRODUCTION.to_string());
        self.manager.context_mut().set_environment(environment);

        tracing::info!(
            "Starting host initialization ({} modules, environment: {})...",
            self.manager.len(),
            self.manager.context().environment()
        );

        self.manager.configure_services()?;

        let services = Arc::new(self.manager.context().services().build());

        if let Err(e) = self.manager.initialize(Arc::clone(&services)) {
            let report = self.manager.shutdown();
            services.dispose();
            tracing::error!(
                "Host initialization failed; rolled back {} modules",
                report.attempted()
            );
            return Err(e);
        }

        tracing::info!("Host initialization complete");

        Ok(Host::new(self.manager, services))
    }
}
