use super::key::short_type_name;
use super::{ModuleDefinition, ModuleKey};

/// Declarative metadata of a module type.
///
/// This is the entire surface the resolver and lifecycle manager read from a
/// module definition.
#[derive(Debug, Clone)]
pub struct ModuleMetadata {
    name: String,
    description: Option<String>,
    dependencies: Vec<ModuleKey>,
    priority: i32,
    load_on_demand: bool,
}

impl ModuleMetadata {
    /// Metadata named after `T`, with no dependencies and priority 0
    pub fn for_type<T: ?Sized + 'static>() -> Self {
        Self::named(short_type_name(std::any::type_name::<T>()))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            dependencies: Vec::new(),
            priority: 0,
            load_on_demand: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Higher priorities are ordered earlier among independent modules
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Exclude the module from bulk discovery
    pub fn on_demand(mut self, load_on_demand: bool) -> Self {
        self.load_on_demand = load_on_demand;
        self
    }

    /// Declare a dependency on another module type
    pub fn depends_on<M: ModuleDefinition>(self) -> Self {
        self.depends_on_key(ModuleKey::of::<M>())
    }

    /// Declare a dependency by key. Duplicate declarations are ignored.
    pub fn depends_on_key(mut self, key: ModuleKey) -> Self {
        if !self.dependencies.contains(&key) {
            self.dependencies.push(key);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description, falling back to the name
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    pub fn dependencies(&self) -> &[ModuleKey] {
        &self.dependencies
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn load_on_demand(&self) -> bool {
        self.load_on_demand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;

    #[test]
    fn test_defaults() {
        let metadata = ModuleMetadata::for_type::<Alpha>();
        assert_eq!(metadata.name(), "Alpha");
        assert_eq!(metadata.description(), "Alpha");
        assert_eq!(metadata.priority(), 0);
        assert!(!metadata.load_on_demand());
        assert!(metadata.dependencies().is_empty());
    }

    #[test]
    fn test_dependencies_are_an_ordered_set() {
        let metadata = ModuleMetadata::for_type::<Alpha>()
            .depends_on_key(ModuleKey::of_type::<Beta>())
            .depends_on_key(ModuleKey::of_type::<Alpha>())
            .depends_on_key(ModuleKey::of_type::<Beta>());

        assert_eq!(
            metadata.dependencies(),
            &[ModuleKey::of_type::<Beta>(), ModuleKey::of_type::<Alpha>()]
        );
    }

    #[test]
    fn test_builder_overrides() {
        let metadata = ModuleMetadata::for_type::<Alpha>()
            .with_name("Billing")
            .with_description("Invoices and payments")
            .with_priority(-5)
            .on_demand(true);

        assert_eq!(metadata.name(), "Billing");
        assert_eq!(metadata.description(), "Invoices and payments");
        assert_eq!(metadata.priority(), -5);
        assert!(metadata.load_on_demand());
    }
}
