use crate::di::provider::{ProviderInner, ServiceProvider, ServiceResolver};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;
use strum_macros::{AsRefStr, Display};

pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// Type-erased factory. Receives a resolver so it can pull in its own dependencies.
pub(crate) type FactoryFn =
    Arc<dyn Fn(&ServiceResolver<'_>) -> anyhow::Result<AnyArc> + Send + Sync>;

/// Casts a resolved implementation (`Arc<Impl>` as `Arc<dyn Any>`) into an
/// `Arc<dyn Any>` wrapping the `Arc<dyn Trait>`. `None` if the implementation
/// has an unexpected concrete type.
pub(crate) type CasterFn = Arc<dyn Fn(AnyArc) -> Option<AnyArc> + Send + Sync>;

/// How long a factory-produced service lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum ServiceLifetime {
    /// Created once per provider, on first request
    Singleton,
    /// Created once per [`ServiceScope`](crate::di::ServiceScope)
    Scoped,
    /// Created on every request
    Transient,
}

#[derive(Clone)]
pub(crate) enum ServiceKind {
    Instance(AnyArc),
    Factory {
        lifetime: ServiceLifetime,
        factory: FactoryFn,
    },
}

#[derive(Clone)]
pub(crate) struct ServiceEntry {
    pub(crate) type_name: &'static str,
    pub(crate) kind: ServiceKind,
}

/// Mutable service registry threaded through the configure phase.
///
/// Modules add services here from `Module::configure_services`. Once every
/// module has been configured the host freezes the registry into a
/// [`ServiceProvider`] with [`ServiceRegistry::build`].
///
/// Registering the same type twice replaces the earlier registration.
///
/// # Example
/// ```
/// use modhost::di::ServiceRegistry;
///
/// struct Clock;
/// struct Greeter { prefix: String }
///
/// let mut registry = ServiceRegistry::new();
/// registry.add_instance(Clock);
/// registry.add_singleton(|_| Ok(Greeter { prefix: "hello".into() }));
///
/// let provider = registry.build();
/// assert_eq!(provider.get_required_service::<Greeter>().unwrap().prefix, "hello");
/// ```
pub struct ServiceRegistry {
    services: DashMap<TypeId, ServiceEntry>,
    trait_mappings: DashMap<TypeId, TypeId>,
    casters: DashMap<TypeId, CasterFn>,
}

impl Clone for ServiceRegistry {
    fn clone(&self) -> Self {
        Self {
            services: self.services.clone(),
            trait_mappings: self.trait_mappings.clone(),
            casters: self.casters.clone(),
        }
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            trait_mappings: DashMap::new(),
            casters: DashMap::new(),
        }
    }

    /// Register an already constructed instance
    pub fn add_instance<T: 'static + Send + Sync>(&mut self, instance: T) -> &mut Self {
        self.insert::<T>(ServiceKind::Instance(Arc::new(instance)));
        self
    }

    /// Register an instance that is already shared elsewhere
    pub fn add_shared<T: 'static + Send + Sync>(&mut self, instance: Arc<T>) -> &mut Self {
        self.insert::<T>(ServiceKind::Instance(instance));
        self
    }

    /// Register a factory invoked at most once per provider
    pub fn add_singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ServiceResolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.add_factory(ServiceLifetime::Singleton, factory)
    }

    /// Register a factory invoked once per scope
    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ServiceResolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.add_factory(ServiceLifetime::Scoped, factory)
    }

    /// Register a factory invoked on every resolution
    pub fn add_transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ServiceResolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.add_factory(ServiceLifetime::Transient, factory)
    }

    fn add_factory<T, F>(&mut self, lifetime: ServiceLifetime, factory: F) -> &mut Self
    where
        T: 'static + Send + Sync,
        F: Fn(&ServiceResolver<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn = Arc::new(move |resolver: &ServiceResolver<'_>| {
            let instance = factory(resolver)?;
            Ok(Arc::new(instance) as AnyArc)
        });
        self.insert::<T>(ServiceKind::Factory { lifetime, factory });
        self
    }

    /// Bind a trait to a concrete implementation
    ///
    /// This enables resolving `Arc<dyn Trait>` to the registered implementation.
    /// The implementation may be registered before or after the binding.
    pub fn bind<Trait, Impl, F>(&mut self, caster_fn: F) -> &mut Self
    where
        Trait: ?Sized + 'static + Send + Sync,
        Impl: 'static + Send + Sync,
        F: Fn(Arc<Impl>) -> Arc<Trait> + 'static + Send + Sync,
    {
        let trait_id = TypeId::of::<Trait>();
        let impl_id = TypeId::of::<Impl>();

        self.trait_mappings.insert(trait_id, impl_id);

        let caster: CasterFn = Arc::new(move |instance: AnyArc| {
            let concrete = instance.downcast::<Impl>().ok()?;
            let trait_obj: Arc<Trait> = caster_fn(concrete);
            // Wrap the Arc<dyn Trait> in an Arc<dyn Any>
            Some(Arc::new(trait_obj) as AnyArc)
        });

        self.casters.insert(trait_id, caster);
        self
    }

    fn insert<T: 'static>(&mut self, kind: ServiceKind) {
        let type_name = std::any::type_name::<T>();
        if self.services.contains_key(&TypeId::of::<T>()) {
            tracing::debug!("Replacing service registration: {}", type_name);
        }
        self.services
            .insert(TypeId::of::<T>(), ServiceEntry { type_name, kind });
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.services.contains_key(&type_id) || self.trait_mappings.contains_key(&type_id)
    }

    /// Lifetime of a factory registration; `None` for instances and unknown types
    pub fn lifetime_of<T: 'static>(&self) -> Option<ServiceLifetime> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|entry| match &entry.kind {
                ServiceKind::Factory { lifetime, .. } => Some(*lifetime),
                ServiceKind::Instance(_) => None,
            })
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Freeze the current registrations into a resolver.
    ///
    /// The registry stays usable; later registrations do not affect
    /// providers that were already built.
    pub fn build(&self) -> ServiceProvider {
        tracing::debug!("Building service provider ({} services)", self.len());
        ServiceProvider::from_inner(ProviderInner::new(
            self.services.clone(),
            self.trait_mappings.clone(),
            self.casters.clone(),
        ))
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
