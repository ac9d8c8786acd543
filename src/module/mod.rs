//! Module contract
//!
//! A module is a self-contained unit that registers services, runs startup
//! logic and releases its resources on shutdown. The host drives every loaded
//! module through three phases, in dependency order:
//!
//! ```text
//! configure_services   (dependencies first)
//!        ↓
//! initialize           (dependencies first, services resolvable)
//!        ↓
//! [Running...]
//!        ↓
//! shutdown             (reverse order, best effort)
//! ```

mod descriptor;
mod key;
mod metadata;
mod source;

pub use descriptor::{ModuleDescriptor, ModuleInfo, ModuleState};
pub use key::ModuleKey;
pub use metadata::ModuleMetadata;
pub use source::{ModuleCatalog, ModuleSource};

use crate::lifecycle::ModuleContext;

/// Result returned by module phase callbacks
pub type ModuleResult = anyhow::Result<()>;

/// Trait for application modules
///
/// Every phase has a no-op default so implementers override only what they
/// need. Callbacks run sequentially on the caller's thread; a module may rely
/// on everything its dependencies registered during `configure_services`
/// being resolvable from `initialize` onwards.
///
/// # Example
/// ```
/// use modhost::{Module, ModuleContext, ModuleResult};
///
/// struct Clock;
///
/// #[derive(Default)]
/// struct ClockModule;
///
/// impl Module for ClockModule {
///     fn configure_services(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
///         ctx.services_mut().add_instance(Clock);
///         Ok(())
///     }
/// }
/// ```
pub trait Module: Send + 'static {
    /// Register services. Other modules' services are not resolvable yet.
    fn configure_services(&mut self, _ctx: &mut ModuleContext) -> ModuleResult {
        Ok(())
    }

    /// Startup work using already registered services
    fn initialize(&mut self, _ctx: &mut ModuleContext) -> ModuleResult {
        Ok(())
    }

    /// Release resources. Failures are reported but never abort shutdown.
    fn shutdown(&mut self, _ctx: &mut ModuleContext) -> ModuleResult {
        Ok(())
    }
}

/// Static declaration of a module type: its metadata and how to construct it.
///
/// Usually generated by the [`module`](macro@crate::module) attribute macro.
///
/// # Example
/// ```
/// use modhost::{Module, ModuleDefinition, ModuleMetadata};
///
/// #[derive(Default)]
/// struct StorageModule;
/// impl Module for StorageModule {}
///
/// #[derive(Default)]
/// struct OrdersModule;
/// impl Module for OrdersModule {}
///
/// impl ModuleDefinition for OrdersModule {
///     fn metadata() -> ModuleMetadata {
///         ModuleMetadata::for_type::<Self>()
///             .with_priority(10)
///             .depends_on::<StorageModule>()
///     }
///
///     fn create() -> Self {
///         OrdersModule
///     }
/// }
/// # impl ModuleDefinition for StorageModule {
/// #     fn metadata() -> ModuleMetadata { ModuleMetadata::for_type::<Self>() }
/// #     fn create() -> Self { StorageModule }
/// # }
/// ```
pub trait ModuleDefinition: Module + Sized {
    /// Dependencies, display name, priority and on-demand flag
    fn metadata() -> ModuleMetadata;

    /// Construct the single live instance of this module
    fn create() -> Self;
}
