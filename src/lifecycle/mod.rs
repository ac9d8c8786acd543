//! Module Lifecycle
//!
//! Resolves the module dependency graph and drives every module through
//! its phases.
//!
//! # Lifecycle Phases
//!
//! ```text
//! 1. Module Loading (root module, dependencies, discovered modules)
//!    ↓
//! 2. Validation + Dependency Resolution   ← fatal on missing/invalid/cyclic
//!    ↓
//! 3. ConfigureServices (each module, resolved order)
//!    ↓
//! 4. Service Provider Build
//!    ↓
//! 5. Initialize (each module, resolved order)
//!    ↓
//! [Running...]
//!    ↓
//! 6. Shutdown (each initialized module, reverse order, best effort)
//!    ↓
//! 7. Service Provider Disposal
//! ```
//!
//! Phases run sequentially on the caller's thread and accept no
//! cancellation: a long-running callback blocks the whole sequence.
//!
//! # Example
//!
//! ```rust,ignore
//! use modhost::{Module, ModuleContext, ModuleResult};
//!
//! #[module(dependencies = [DatabaseModule])]
//! #[derive(Default)]
//! pub struct ReportingModule;
//!
//! impl Module for ReportingModule {
//!     fn initialize(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
//!         let db = ctx.service_provider()?.get_required_service::<Database>()?;
//!         tracing::info!("Reporting against {}", db.url());
//!         Ok(())
//!     }
//! }
//! ```

mod context;
mod error;
mod manager;
mod resolver;
mod shutdown;

pub use context::{DEVELOPMENT, ModuleContext, PRODUCTION, STAGING};
pub use error::{LifecycleError, LifecyclePhase, Result, ShutdownFault, ShutdownReport};
pub use manager::LifecycleManager;
pub use resolver::{DependencyResolver, resolve_order, transitive_dependencies};
pub use shutdown::shutdown_signal;
