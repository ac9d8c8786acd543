//! # Modhost
//!
//! A host bootstrapper for pluggable application modules.
//!
//! Modules declare their dependencies and a priority; the host loads them,
//! computes a deterministic dependency-first order, and drives every module
//! through a strict lifecycle: services are registered during
//! `configure_services`, startup work runs during `initialize` with every
//! registered service resolvable, and `shutdown` releases resources in
//! reverse order.
//!
//! ## Features
//!
//! - **Dependency Resolution**: Topological ordering with priority tie-breaking
//!   and actionable cycle reports
//! - **Fail-fast Startup**: The first module fault aborts startup with the
//!   offending module's name
//! - **Best-effort Shutdown**: Every initialized module is shut down even if
//!   one of them fails
//! - **Service Registry**: Singleton, scoped and transient services with
//!   trait object bindings
//! - **Declarative Modules**: `#[module(dependencies = [...])]`
//!
//! ## Quick Start
//!
//! ```rust
//! use modhost::prelude::*;
//!
//! pub struct Database {
//!     pub url: String,
//! }
//!
//! #[module(name = "Storage", priority = 10)]
//! #[derive(Default)]
//! pub struct StorageModule;
//!
//! impl Module for StorageModule {
//!     fn configure_services(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
//!         ctx.services_mut().add_instance(Database { url: "memory://".into() });
//!         Ok(())
//!     }
//! }
//!
//! #[module(dependencies = [StorageModule])]
//! #[derive(Default)]
//! pub struct AppModule;
//!
//! impl Module for AppModule {
//!     fn initialize(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
//!         let db = ctx.service_provider()?.get_required_service::<Database>()?;
//!         assert_eq!(db.url, "memory://");
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut host = Host::builder()
//!         .environment("Development")
//!         .root_module::<AppModule>()?
//!         .build()?;
//!
//!     assert_eq!(host.modules().len(), 2);
//!     assert!(host.dispose().is_clean());
//!     Ok(())
//! }
//! ```

// Lets `#[module]` expansions refer to `::modhost` from inside this crate
extern crate self as modhost;

pub mod config;
pub mod di;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod module;

// Re-export core types
pub use config::Configuration;
pub use di::{ServiceLifetime, ServiceProvider, ServiceRegistry, ServiceResolver, ServiceScope};
pub use error::{Result, ServiceError};
pub use host::{Host, HostBuilder};
pub use lifecycle::{
    DependencyResolver, LifecycleError, LifecycleManager, LifecyclePhase, ModuleContext,
    ShutdownFault, ShutdownReport,
};
pub use module::{
    Module, ModuleCatalog, ModuleDefinition, ModuleDescriptor, ModuleInfo, ModuleKey,
    ModuleMetadata, ModuleResult, ModuleSource, ModuleState,
};

// Re-export macros
pub use modhost_macro::module;

/// Prelude module for convenient imports
///
/// ```
/// use modhost::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Configuration;
    pub use crate::di::{ServiceProvider, ServiceRegistry, ServiceResolver, ServiceScope};
    pub use crate::error::ServiceError;
    pub use crate::host::{Host, HostBuilder};
    pub use crate::lifecycle::{
        LifecycleError, LifecycleManager, ModuleContext, ShutdownReport, shutdown_signal,
    };
    pub use crate::module::{
        Module, ModuleCatalog, ModuleDefinition, ModuleKey, ModuleMetadata, ModuleResult,
        ModuleSource, ModuleState,
    };
    pub use crate::module;
    pub use std::sync::Arc;
}
