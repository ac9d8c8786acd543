use super::{ModuleDefinition, ModuleKey};

/// A source of candidate module keys for bulk discovery
///
/// Each key is loaded individually through the same path as an explicit
/// declaration. Keys flagged load-on-demand are skipped by bulk loading.
pub trait ModuleSource {
    fn module_keys(&self) -> Vec<ModuleKey>;
}

/// Explicit plugin registration list
///
/// # Example
/// ```
/// use modhost::{Module, ModuleCatalog, ModuleDefinition, ModuleMetadata, ModuleSource};
///
/// #[derive(Default)]
/// struct Metrics;
/// impl Module for Metrics {}
/// impl ModuleDefinition for Metrics {
///     fn metadata() -> ModuleMetadata { ModuleMetadata::for_type::<Self>() }
///     fn create() -> Self { Metrics }
/// }
///
/// let catalog = ModuleCatalog::new().with::<Metrics>();
/// assert_eq!(catalog.module_keys().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    keys: Vec<ModuleKey>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module type; registering the same type twice keeps the first entry
    pub fn with<M: ModuleDefinition>(mut self) -> Self {
        self.register::<M>();
        self
    }

    pub fn register<M: ModuleDefinition>(&mut self) -> &mut Self {
        self.register_key(ModuleKey::of::<M>())
    }

    pub fn register_key(&mut self, key: ModuleKey) -> &mut Self {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ModuleSource for ModuleCatalog {
    fn module_keys(&self) -> Vec<ModuleKey> {
        self.keys.clone()
    }
}

impl ModuleSource for [ModuleKey] {
    fn module_keys(&self) -> Vec<ModuleKey> {
        self.to_vec()
    }
}

impl ModuleSource for Vec<ModuleKey> {
    fn module_keys(&self) -> Vec<ModuleKey> {
        self.clone()
    }
}
