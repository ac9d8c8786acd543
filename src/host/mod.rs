//! Host Bootstrap
//!
//! The composition root: owns the lifecycle manager and the built service
//! provider, and shuts modules down when disposed.

mod builder;

pub use builder::{ENVIRONMENT_VARIABLE, HostBuilder};

use crate::config::Configuration;
use crate::di::{ServiceProvider, ServiceScope};
use crate::error::Result;
use crate::lifecycle::{LifecycleManager, ModuleContext, ShutdownReport, shutdown_signal};
use crate::module::{ModuleDescriptor, ModuleKey};
use std::future::Future;
use std::sync::Arc;

/// A started host
///
/// Dropping a host disposes it. Call [`Host::dispose`] explicitly to inspect
/// the shutdown report.
pub struct Host {
    manager: LifecycleManager,
    services: Arc<ServiceProvider>,
    disposed: bool,
}

impl Host {
    /// Create a new host builder
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    pub(crate) fn new(manager: LifecycleManager, services: Arc<ServiceProvider>) -> Self {
        Self {
            manager,
            services,
            disposed: false,
        }
    }

    pub fn get_required_service<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        self.services.get_required_service::<T>()
    }

    pub fn get_service<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services.get_service::<T>()
    }

    pub fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        self.services.get_trait::<T>()
    }

    /// Open a resolution scope for scoped services
    pub fn create_scope(&self) -> ServiceScope {
        self.services.create_scope()
    }

    pub fn services(&self) -> &Arc<ServiceProvider> {
        &self.services
    }

    /// Loaded modules in resolved order
    pub fn modules(&self) -> Vec<&ModuleDescriptor> {
        self.manager.modules()
    }

    pub fn module_order(&self) -> &[ModuleKey] {
        self.manager.resolved_order()
    }

    pub fn environment(&self) -> &str {
        self.manager.context().environment()
    }

    pub fn configuration(&self) -> &Configuration {
        self.manager.context().configuration()
    }

    pub fn context(&self) -> &ModuleContext {
        self.manager.context()
    }

    pub fn lifecycle_manager(&self) -> &LifecycleManager {
        &self.manager
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Shut every module down in reverse order, then release the service
    /// provider. Calling this again does nothing and returns an empty report.
    pub fn dispose(&mut self) -> ShutdownReport {
        if self.disposed {
            tracing::debug!("Host already disposed");
            return ShutdownReport::default();
        }
        self.disposed = true;

        tracing::info!("Shutting down host...");
        let report = self.manager.shutdown();
        self.services.dispose();

        if report.is_clean() {
            tracing::info!("Host shutdown complete");
        } else {
            tracing::warn!(
                "Host shutdown complete with {} module faults",
                report.faults.len()
            );
        }
        report
    }

    /// Wait for `signal` to complete, then dispose the host
    pub async fn run_until<F>(mut self, signal: F) -> ShutdownReport
    where
        F: Future<Output = ()>,
    {
        signal.await;
        self.dispose()
    }

    /// Wait for Ctrl+C or SIGTERM, then dispose the host
    pub async fn run_until_shutdown_signal(self) -> ShutdownReport {
        self.run_until(shutdown_signal()).await
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("environment", &self.environment())
            .field("modules", &self.manager.resolved_order())
            .field("disposed", &self.disposed)
            .finish()
    }
}
