use super::{Module, ModuleDefinition, ModuleMetadata};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone, Copy)]
pub(crate) struct ModuleFactory {
    pub(crate) create: fn() -> Box<dyn Module>,
    pub(crate) metadata: fn() -> ModuleMetadata,
}

fn create_boxed<M: ModuleDefinition>() -> Box<dyn Module> {
    Box::new(M::create())
}

/// Stable identity of a module type.
///
/// Equality and hashing use the type identity only. A key created with
/// [`ModuleKey::of`] also knows how to construct its module, which is what
/// lets the lifecycle manager load dependencies recursively.
#[derive(Clone, Copy)]
pub struct ModuleKey {
    type_id: TypeId,
    type_name: &'static str,
    factory: Option<ModuleFactory>,
}

impl ModuleKey {
    /// Key of a module type
    pub fn of<M: ModuleDefinition>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
            factory: Some(ModuleFactory {
                create: create_boxed::<M>,
                metadata: M::metadata,
            }),
        }
    }

    /// Bare identity of an arbitrary type.
    ///
    /// Such a key cannot construct a module. Declared as a dependency it is
    /// only satisfied when a descriptor for the same type is already loaded;
    /// otherwise resolution fails with an invalid module declaration.
    pub fn of_type<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            factory: None,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path, e.g. `OrdersModule`
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    /// Whether this key identifies a constructible module type
    pub fn is_module(&self) -> bool {
        self.factory.is_some()
    }

    /// Static metadata of the module, if this key identifies one
    pub fn metadata(&self) -> Option<ModuleMetadata> {
        self.factory.map(|f| (f.metadata)())
    }

    pub(crate) fn factory(&self) -> Option<ModuleFactory> {
        self.factory
    }
}

pub(crate) fn short_type_name(type_name: &'static str) -> &'static str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

impl PartialEq for ModuleKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModuleKey {}

impl Hash for ModuleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleKey").field(&self.type_name).finish()
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
