use super::{Module, ModuleDefinition, ModuleKey, ModuleMetadata};
use crate::lifecycle::{LifecycleError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter};

/// Lifecycle state of a loaded module
///
/// ```text
/// Discovered → Loading → Loaded → ConfiguringServices → ServicesConfigured
///     → Initializing → Initialized → ShuttingDown → ShutDown
///
/// Error is terminal and reachable from Loading, ConfiguringServices,
/// Initializing and ShuttingDown.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, Serialize)]
pub enum ModuleState {
    Discovered,
    Loading,
    Loaded,
    ConfiguringServices,
    ServicesConfigured,
    Initializing,
    Initialized,
    ShuttingDown,
    ShutDown,
    Error,
}

impl ModuleState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: ModuleState) -> bool {
        use ModuleState::*;
        matches!(
            (self, next),
            (Discovered, Loading)
                | (Loading, Loaded)
                | (Loaded, ConfiguringServices)
                | (ConfiguringServices, ServicesConfigured)
                | (ServicesConfigured, Initializing)
                | (Initializing, Initialized)
                | (Initialized, ShuttingDown)
                | (ShuttingDown, ShutDown)
        ) || (next == Error && self.is_active())
    }

    /// Every state legally reachable in one step from this one
    pub fn successors(self) -> Vec<ModuleState> {
        ModuleState::iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    /// A phase callback is in progress
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ModuleState::Loading
                | ModuleState::ConfiguringServices
                | ModuleState::Initializing
                | ModuleState::ShuttingDown
        )
    }

    /// No further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, ModuleState::ShutDown | ModuleState::Error)
    }
}

/// Serializable snapshot of a descriptor, used for introspection
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub key: String,
    pub name: String,
    pub description: String,
    pub dependencies: Vec<String>,
    pub priority: i32,
    pub load_on_demand: bool,
    pub state: ModuleState,
    pub loaded_at: Option<DateTime<Utc>>,
    pub initialized_at: Option<DateTime<Utc>>,
}

/// The lifecycle-visible record of one loaded module: identity, metadata,
/// the live instance and its current state.
pub struct ModuleDescriptor {
    key: ModuleKey,
    instance: Box<dyn Module>,
    metadata: ModuleMetadata,
    state: ModuleState,
    loaded_at: Option<DateTime<Utc>>,
    initialized_at: Option<DateTime<Utc>>,
}

impl ModuleDescriptor {
    /// Descriptor for an arbitrary key, instance and metadata, in the
    /// `Discovered` state
    pub fn new(key: ModuleKey, instance: Box<dyn Module>, metadata: ModuleMetadata) -> Self {
        Self {
            key,
            instance,
            metadata,
            state: ModuleState::Discovered,
            loaded_at: None,
            initialized_at: None,
        }
    }

    /// Instantiate `M` and read its declared metadata
    pub fn of<M: ModuleDefinition>() -> Self {
        Self::new(ModuleKey::of::<M>(), Box::new(M::create()), M::metadata())
    }

    /// Instantiate the module a key identifies; `None` for bare type keys
    pub fn from_key(key: ModuleKey) -> Option<Self> {
        key.factory()
            .map(|factory| Self::new(key, (factory.create)(), (factory.metadata)()))
    }

    pub fn key(&self) -> ModuleKey {
        self.key
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    pub fn description(&self) -> &str {
        self.metadata.description()
    }

    pub fn dependencies(&self) -> &[ModuleKey] {
        self.metadata.dependencies()
    }

    pub fn priority(&self) -> i32 {
        self.metadata.priority()
    }

    pub fn load_on_demand(&self) -> bool {
        self.metadata.load_on_demand()
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        self.initialized_at
    }

    pub(crate) fn instance_mut(&mut self) -> &mut dyn Module {
        self.instance.as_mut()
    }

    /// Move to `next`, stamping `loaded_at` / `initialized_at` the first
    /// time the corresponding state is reached.
    pub(crate) fn transition(&mut self, next: ModuleState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            tracing::debug!(
                "{} cannot move from {} to {}; allowed: {:?}",
                self.name(),
                self.state,
                next,
                self.state.successors()
            );
            return Err(LifecycleError::InvalidTransition {
                module: self.name().to_string(),
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("{}: {} -> {}", self.name(), self.state, next);
        self.state = next;

        match next {
            ModuleState::Loaded if self.loaded_at.is_none() => {
                self.loaded_at = Some(Utc::now());
            }
            ModuleState::Initialized if self.initialized_at.is_none() => {
                self.initialized_at = Some(Utc::now());
            }
            _ => {}
        }
        Ok(())
    }

    pub fn info(&self) -> ModuleInfo {
        ModuleInfo {
            key: self.key.type_name().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            dependencies: self
                .dependencies()
                .iter()
                .map(|d| d.type_name().to_string())
                .collect(),
            priority: self.priority(),
            load_on_demand: self.load_on_demand(),
            state: self.state,
            loaded_at: self.loaded_at,
            initialized_at: self.initialized_at,
        }
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("key", &self.key)
            .field("name", &self.name())
            .field("priority", &self.priority())
            .field("state", &self.state)
            .finish()
    }
}
