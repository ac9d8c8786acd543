//! Shared module context
//!
//! A single mutable object created by the host builder and threaded through
//! every phase call. Access is sequential; nothing here is synchronized for
//! concurrent use by several modules.

use super::{LifecycleError, Result};
use crate::config::Configuration;
use crate::di::{ServiceProvider, ServiceRegistry};
use crate::module::ModuleInfo;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEVELOPMENT: &str = "Development";
pub const STAGING: &str = "Staging";
pub const PRODUCTION: &str = "Production";

/// Context passed to every module phase callback
pub struct ModuleContext {
    services: ServiceRegistry,
    configuration: Configuration,
    environment: String,
    properties: HashMap<String, Box<dyn Any + Send>>,
    service_provider: Option<Arc<ServiceProvider>>,
    modules: Arc<[ModuleInfo]>,
}

impl ModuleContext {
    pub fn new(
        services: ServiceRegistry,
        configuration: Configuration,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            services,
            configuration,
            environment: environment.into(),
            properties: HashMap::new(),
            service_provider: None,
            modules: Arc::from(Vec::new()),
        }
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Registry for service registration during the configure phase
    pub fn services_mut(&mut self) -> &mut ServiceRegistry {
        &mut self.services
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub(crate) fn set_environment(&mut self, environment: impl Into<String>) {
        self.environment = environment.into();
    }

    pub(crate) fn set_configuration(&mut self, configuration: Configuration) {
        self.configuration = configuration;
    }

    /// Case-insensitive environment name comparison
    pub fn is_environment(&self, name: &str) -> bool {
        self.environment.eq_ignore_ascii_case(name)
    }

    pub fn is_development(&self) -> bool {
        self.is_environment(DEVELOPMENT)
    }

    pub fn is_production(&self) -> bool {
        self.is_environment(PRODUCTION)
    }

    /// The built resolver; `None` until the initialize phase begins
    pub fn try_service_provider(&self) -> Option<&Arc<ServiceProvider>> {
        self.service_provider.as_ref()
    }

    /// The built resolver. Fails when called during the configure phase.
    pub fn service_provider(&self) -> Result<&Arc<ServiceProvider>> {
        self.service_provider
            .as_ref()
            .ok_or(LifecycleError::ServicesNotConfigured)
    }

    pub(crate) fn set_service_provider(&mut self, provider: Arc<ServiceProvider>) {
        self.service_provider = Some(provider);
    }

    /// Snapshot of every loaded module, in resolved order, captured when
    /// the configure phase began
    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    pub(crate) fn set_modules(&mut self, modules: Vec<ModuleInfo>) {
        self.modules = Arc::from(modules);
    }

    /// Store a value for other modules; replaces any previous value under `key`
    pub fn set_property<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.properties.insert(key.into(), Box::new(value));
    }

    /// Read a property; `None` if missing or of another type
    pub fn property<T: Any + Send>(&self, key: &str) -> Option<&T> {
        self.properties.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn property_mut<T: Any + Send>(&mut self, key: &str) -> Option<&mut T> {
        self.properties.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Remove and return a property; a value of another type is left in place
    pub fn remove_property<T: Any + Send>(&mut self, key: &str) -> Option<T> {
        if !self.properties.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.properties
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

impl Default for ModuleContext {
    fn default() -> Self {
        Self::new(ServiceRegistry::new(), Configuration::new(), PRODUCTION)
    }
}
