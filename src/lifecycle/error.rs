//! Lifecycle-specific error types
//!
//! Startup faults are fatal and surface as [`LifecycleError`]. Shutdown
//! faults are recoverable: they are collected into a [`ShutdownReport`] and
//! never returned as an `Err`.

use crate::error::ServiceError;
use crate::module::ModuleState;
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// The three points at which the host invokes module logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum LifecyclePhase {
    ConfigureServices,
    Initialize,
    Shutdown,
}

/// Fatal errors raised while loading, resolving or starting modules
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A declared dependency does not identify a module type
    #[error("Module {module} declares dependency {dependency}, which is not a module")]
    InvalidModuleDeclaration { module: String, dependency: String },

    /// A declared dependency has no loaded descriptor
    #[error("Module {module} depends on {dependency}, which is not loaded")]
    MissingDependency { module: String, dependency: String },

    /// A key passed for explicit loading cannot construct a module
    #[error("Type {key} is not a module")]
    NotAModule { key: String },

    /// A cycle was found while ordering modules
    #[error("Circular dependency detected: {}", path.join(" -> "))]
    CircularDependency {
        /// Module keys from the start of the cycle back to the repeated key
        path: Vec<String>,
    },

    /// A module's configure or initialize callback failed
    #[error("Module {module} failed during {phase}: {source}")]
    ModuleFailed {
        module: String,
        phase: LifecyclePhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("Services have already been configured")]
    ServicesAlreadyConfigured,

    #[error("Services must be configured before modules are initialized")]
    ServicesNotConfigured,

    #[error("Modules have already been initialized")]
    AlreadyInitialized,

    #[error("A root module has already been declared: {existing}")]
    RootModuleAlreadyDeclared { existing: String },

    #[error("Illegal state transition for {module}: {from} -> {to}")]
    InvalidTransition {
        module: String,
        from: ModuleState,
        to: ModuleState,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl LifecycleError {
    /// Create a module failure error
    pub fn module_failed(
        module: impl Into<String>,
        phase: LifecyclePhase,
        source: anyhow::Error,
    ) -> Self {
        Self::ModuleFailed {
            module: module.into(),
            phase,
            source,
        }
    }

    /// The module set itself is malformed (bad declaration, missing
    /// dependency or cycle)
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidModuleDeclaration { .. }
                | Self::NotAModule { .. }
                | Self::MissingDependency { .. }
                | Self::CircularDependency { .. }
        )
    }

    /// The host API was driven in the wrong order
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::ServicesAlreadyConfigured
                | Self::ServicesNotConfigured
                | Self::AlreadyInitialized
                | Self::RootModuleAlreadyDeclared { .. }
                | Self::InvalidTransition { .. }
        )
    }
}

/// A module's shutdown callback failed. Recoverable: shutdown continues.
#[derive(Debug, Error)]
#[error("Module {module} failed during shutdown: {source}")]
pub struct ShutdownFault {
    pub module: String,
    #[source]
    pub source: anyhow::Error,
}

/// Outcome of a shutdown pass
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Names of modules whose shutdown callback ran, in invocation order
    pub stopped: Vec<String>,
    pub faults: Vec<ShutdownFault>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }

    /// Number of modules whose shutdown callback was invoked
    pub fn attempted(&self) -> usize {
        self.stopped.len()
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
