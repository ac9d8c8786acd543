//! Lifecycle Manager
//!
//! Owns the loaded module descriptors and drives them through the
//! configure, initialize and shutdown phases in resolved order.

use super::resolver::DependencyResolver;
use super::{
    LifecycleError, LifecyclePhase, ModuleContext, Result, ShutdownFault, ShutdownReport,
};
use crate::di::ServiceProvider;
use crate::module::{
    ModuleDefinition, ModuleDescriptor, ModuleInfo, ModuleKey, ModuleSource, ModuleState,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Drives every loaded module through its lifecycle
///
/// The LifecycleManager is responsible for:
/// - Loading modules and, recursively, their declared dependencies
/// - Computing the resolved order with the [`DependencyResolver`]
/// - Executing phase callbacks in that order (shutdown in reverse)
/// - Converting module faults into lifecycle errors
///
/// Startup phases are fail-fast: the first failing module aborts the
/// sequence. Shutdown is best effort: a failing module is reported and the
/// remaining modules are still shut down.
///
/// # Example
///
/// ```rust
/// use modhost::{LifecycleManager, Module, ModuleContext, ModuleDefinition, ModuleMetadata};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Storage;
/// impl Module for Storage {}
/// impl ModuleDefinition for Storage {
///     fn metadata() -> ModuleMetadata { ModuleMetadata::for_type::<Self>() }
///     fn create() -> Self { Storage }
/// }
///
/// let mut manager = LifecycleManager::new(ModuleContext::default());
/// manager.load_module::<Storage>().unwrap();
///
/// manager.configure_services().unwrap();
/// let provider = Arc::new(manager.context().services().build());
/// manager.initialize(provider).unwrap();
/// // ... application runs ...
/// let report = manager.shutdown();
/// assert!(report.is_clean());
/// ```
pub struct LifecycleManager {
    descriptors: Vec<ModuleDescriptor>,
    context: ModuleContext,
    loading: Vec<ModuleKey>,
    resolved_order: Vec<ModuleKey>,
    services_configured: bool,
    initialized: bool,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(ModuleContext::default())
    }
}

impl LifecycleManager {
    /// Create a manager that threads `context` through every phase
    pub fn new(context: ModuleContext) -> Self {
        Self {
            descriptors: Vec::new(),
            context,
            loading: Vec::new(),
            resolved_order: Vec::new(),
            services_configured: false,
            initialized: false,
        }
    }

    /// Load a module type and its dependencies
    pub fn load_module<M: ModuleDefinition>(&mut self) -> Result<()> {
        self.load(ModuleKey::of::<M>())
    }

    /// Load the module `key` identifies, dependencies first.
    ///
    /// Loading an already loaded key is a no-op. New modules are rejected
    /// with [`LifecycleError::ServicesAlreadyConfigured`] once
    /// `configure_services` has run. Dependencies that are not
    /// module types are left for validation to report.
    pub fn load(&mut self, key: ModuleKey) -> Result<()> {
        if self.is_loaded(key) {
            tracing::trace!("Module already loaded: {}", key);
            return Ok(());
        }
        let descriptor = ModuleDescriptor::from_key(key).ok_or_else(|| {
            LifecycleError::NotAModule {
                key: key.type_name().to_string(),
            }
        })?;
        self.load_descriptor(descriptor)
    }

    /// Insert a pre-built descriptor in the `Discovered` state.
    ///
    /// Returns `false` if a descriptor with the same key is already loaded.
    pub fn add_descriptor(&mut self, descriptor: ModuleDescriptor) -> Result<bool> {
        if self.is_loaded(descriptor.key()) {
            return Ok(false);
        }
        self.load_descriptor(descriptor)?;
        Ok(true)
    }

    /// Load every candidate from `source` that is not flagged load-on-demand.
    ///
    /// Returns the number of modules newly loaded, dependencies included.
    pub fn load_from_source<S: ModuleSource + ?Sized>(&mut self, source: &S) -> Result<usize> {
        self.ensure_loading_open()?;
        let before = self.descriptors.len();

        for key in source.module_keys() {
            let Some(metadata) = key.metadata() else {
                tracing::warn!("Skipping discovered type {}: not a module", key.type_name());
                continue;
            };
            if metadata.load_on_demand() {
                tracing::debug!("Skipping on-demand module: {}", metadata.name());
                continue;
            }
            self.load(key)?;
        }

        let loaded = self.descriptors.len() - before;
        tracing::info!("Loaded {} modules from source", loaded);
        Ok(loaded)
    }

    /// The module set is frozen once the configure phase has run
    fn ensure_loading_open(&self) -> Result<()> {
        if self.services_configured {
            return Err(LifecycleError::ServicesAlreadyConfigured);
        }
        Ok(())
    }

    fn load_descriptor(&mut self, mut descriptor: ModuleDescriptor) -> Result<()> {
        self.ensure_loading_open()?;
        let key = descriptor.key();
        descriptor.transition(ModuleState::Loading)?;
        tracing::debug!("Loading module: {}", descriptor.name());

        self.loading.push(key);
        let dependencies = descriptor.dependencies().to_vec();
        let result = dependencies
            .into_iter()
            .try_for_each(|dependency| self.load_dependency(dependency));
        self.loading.pop();

        if let Err(e) = result {
            tracing::error!("Loading failed for {}: {}", descriptor.name(), e);
            return Err(e);
        }

        descriptor.transition(ModuleState::Loaded)?;
        tracing::debug!("Loaded module: {}", descriptor.name());
        self.descriptors.push(descriptor);
        Ok(())
    }

    fn load_dependency(&mut self, key: ModuleKey) -> Result<()> {
        // A key still on the loading stack is a cycle; ordering reports it.
        if self.is_loaded(key) || self.loading.contains(&key) || !key.is_module() {
            return Ok(());
        }
        self.load(key)
    }

    fn compute_order(&self) -> Result<Vec<ModuleKey>> {
        DependencyResolver::new(&self.descriptors).resolve_order()
    }

    fn index_by_key(&self) -> HashMap<ModuleKey, usize> {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.key(), i))
            .collect()
    }

    /// Run every module's `configure_services` callback in resolved order.
    ///
    /// # Errors
    ///
    /// Fails if services were already configured, if the module set does not
    /// resolve, or on the first module fault (no further modules run).
    pub fn configure_services(&mut self) -> Result<()> {
        if self.services_configured {
            return Err(LifecycleError::ServicesAlreadyConfigured);
        }

        let order = self.compute_order()?;
        let index = self.index_by_key();
        self.services_configured = true;
        self.resolved_order = order.clone();

        let infos: Vec<ModuleInfo> = order
            .iter()
            .map(|key| self.descriptors[index[key]].info())
            .collect();
        self.context.set_modules(infos);

        tracing::info!("Configuring services for {} modules...", order.len());

        for key in &order {
            let descriptor = &mut self.descriptors[index[key]];
            descriptor.transition(ModuleState::ConfiguringServices)?;
            tracing::debug!("Configuring: {}", descriptor.name());

            if let Err(e) = descriptor.instance_mut().configure_services(&mut self.context) {
                tracing::error!("ConfigureServices failed for {}: {:#}", descriptor.name(), e);
                descriptor.transition(ModuleState::Error)?;
                return Err(LifecycleError::module_failed(
                    descriptor.name(),
                    LifecyclePhase::ConfigureServices,
                    e,
                ));
            }

            descriptor.transition(ModuleState::ServicesConfigured)?;
            tracing::debug!("Configured: {}", descriptor.name());
        }

        tracing::info!(
            "ConfigureServices complete ({} modules, {} services registered)",
            order.len(),
            self.context.services().len()
        );
        Ok(())
    }

    /// Run every module's `initialize` callback in resolved order.
    ///
    /// `services` is stored in the context before the first callback runs.
    pub fn initialize(&mut self, services: Arc<ServiceProvider>) -> Result<()> {
        if !self.services_configured {
            return Err(LifecycleError::ServicesNotConfigured);
        }
        if self.initialized {
            return Err(LifecycleError::AlreadyInitialized);
        }

        self.context.set_service_provider(services);
        let order = self.compute_order()?;
        let index = self.index_by_key();
        self.initialized = true;
        self.resolved_order = order.clone();

        tracing::info!("Initializing {} modules...", order.len());

        for key in &order {
            let descriptor = &mut self.descriptors[index[key]];
            descriptor.transition(ModuleState::Initializing)?;
            tracing::debug!("Initializing: {}", descriptor.name());

            if let Err(e) = descriptor.instance_mut().initialize(&mut self.context) {
                tracing::error!("Initialize failed for {}: {:#}", descriptor.name(), e);
                descriptor.transition(ModuleState::Error)?;
                return Err(LifecycleError::module_failed(
                    descriptor.name(),
                    LifecyclePhase::Initialize,
                    e,
                ));
            }

            descriptor.transition(ModuleState::Initialized)?;
            tracing::debug!("Initialized: {}", descriptor.name());
        }

        tracing::info!("Initialize complete ({} modules)", order.len());
        Ok(())
    }

    /// Run `shutdown` on every initialized module in **reverse** resolved order.
    ///
    /// Failures are logged, collected into the report, and do not stop the
    /// remaining modules from shutting down.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let order = match self.compute_order() {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!("Falling back to last resolved order for shutdown: {}", e);
                self.resolved_order.clone()
            }
        };
        let index = self.index_by_key();
        let mut report = ShutdownReport::default();

        tracing::info!("Shutting down modules...");

        for key in order.iter().rev() {
            let Some(&position) = index.get(key) else {
                continue;
            };
            let descriptor = &mut self.descriptors[position];
            if descriptor.state() != ModuleState::Initialized {
                continue;
            }

            if let Err(e) = descriptor.transition(ModuleState::ShuttingDown) {
                tracing::error!("{}", e);
                continue;
            }
            tracing::debug!("Shutting down: {}", descriptor.name());
            report.stopped.push(descriptor.name().to_string());

            let next = match descriptor.instance_mut().shutdown(&mut self.context) {
                Ok(()) => ModuleState::ShutDown,
                Err(e) => {
                    // Log error but continue with other modules
                    tracing::error!("Shutdown failed for {}: {:#}", descriptor.name(), e);
                    report.faults.push(ShutdownFault {
                        module: descriptor.name().to_string(),
                        source: e,
                    });
                    ModuleState::Error
                }
            };
            if let Err(e) = descriptor.transition(next) {
                tracing::error!("{}", e);
            }
        }

        tracing::info!(
            "Shutdown complete ({} modules, {} faults)",
            report.attempted(),
            report.faults.len()
        );
        report
    }

    pub fn is_loaded(&self, key: ModuleKey) -> bool {
        self.descriptors.iter().any(|d| d.key() == key)
    }

    pub fn descriptor(&self, key: ModuleKey) -> Option<&ModuleDescriptor> {
        self.descriptors.iter().find(|d| d.key() == key)
    }

    /// Descriptors in load order (dependencies before dependents)
    pub fn descriptors(&self) -> &[ModuleDescriptor] {
        &self.descriptors
    }

    pub fn state(&self, key: ModuleKey) -> Option<ModuleState> {
        self.descriptor(key).map(|d| d.state())
    }

    /// Order computed by the last configure/initialize pass; empty before
    pub fn resolved_order(&self) -> &[ModuleKey] {
        &self.resolved_order
    }

    /// Descriptors in the last resolved order
    pub fn modules(&self) -> Vec<&ModuleDescriptor> {
        self.resolved_order
            .iter()
            .filter_map(|key| self.descriptor(*key))
            .collect()
    }

    /// Every module `key` depends on, directly or transitively
    pub fn transitive_dependencies(&self, key: ModuleKey) -> HashSet<ModuleKey> {
        DependencyResolver::new(&self.descriptors).transitive_dependencies(key)
    }

    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ModuleContext {
        &mut self.context
    }

    pub fn is_services_configured(&self) -> bool {
        self.services_configured
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Render every descriptor (metadata, state and timestamps) as JSON
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        let infos: Vec<ModuleInfo> = self.descriptors.iter().map(|d| d.info()).collect();
        serde_json::to_string_pretty(&infos)
    }
}
