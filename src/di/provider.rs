use crate::di::registry::{AnyArc, CasterFn, ServiceEntry, ServiceKind, ServiceLifetime};
use crate::di::ServiceScope;
use crate::error::{Result, ServiceError};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) type ScopeCache = DashMap<TypeId, AnyArc>;

pub(crate) struct ProviderInner {
    services: DashMap<TypeId, ServiceEntry>,
    trait_mappings: DashMap<TypeId, TypeId>,
    casters: DashMap<TypeId, CasterFn>,
    singletons: ScopeCache,
    disposed: AtomicBool,
}

impl ProviderInner {
    pub(crate) fn new(
        services: DashMap<TypeId, ServiceEntry>,
        trait_mappings: DashMap<TypeId, TypeId>,
        casters: DashMap<TypeId, CasterFn>,
    ) -> Self {
        Self {
            services,
            trait_mappings,
            casters,
            singletons: DashMap::new(),
            disposed: AtomicBool::new(false),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// Resolution handle passed to service factories.
///
/// A resolver created inside a scope can resolve scoped services; one
/// created by the root provider cannot.
pub struct ServiceResolver<'a> {
    inner: &'a ProviderInner,
    scope: Option<&'a ScopeCache>,
}

impl<'a> ServiceResolver<'a> {
    pub(crate) fn new(inner: &'a ProviderInner, scope: Option<&'a ScopeCache>) -> Self {
        Self { inner, scope }
    }

    /// Resolve a service, failing if it is not registered
    pub fn get_required_service<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        if self.inner.is_disposed() {
            return Err(ServiceError::disposed::<T>());
        }
        self.resolve_any(TypeId::of::<T>(), std::any::type_name::<T>())?
            .downcast::<T>()
            .map_err(|_| ServiceError::downcast_failed::<T>())
    }

    /// Resolve a service, returning `None` if it is not registered.
    ///
    /// Faults other than a missing registration are logged and also yield `None`.
    pub fn get_service<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        match self.get_required_service::<T>() {
            Ok(service) => Some(service),
            Err(ServiceError::ServiceNotFound { .. }) => None,
            Err(e) => {
                tracing::warn!("Optional service resolution failed: {}", e);
                None
            }
        }
    }

    /// Resolve a trait object bound with [`ServiceRegistry::bind`](crate::di::ServiceRegistry::bind)
    pub fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        if self.inner.is_disposed() {
            return Err(ServiceError::disposed::<T>());
        }
        let requested_type_id = TypeId::of::<T>();

        let caster = self
            .inner
            .casters
            .get(&requested_type_id)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(ServiceError::not_found::<T>)?;

        let impl_type_id = self
            .inner
            .trait_mappings
            .get(&requested_type_id)
            .map(|id| *id.value())
            .ok_or_else(|| ServiceError::ServiceNotFound {
                type_name: format!(
                    "No implementation mapping found for trait '{}'",
                    std::any::type_name::<T>()
                ),
            })?;

        let instance = self
            .resolve_any(impl_type_id, std::any::type_name::<T>())
            .map_err(|e| match e {
                ServiceError::ServiceNotFound { .. } => ServiceError::ServiceNotFound {
                    type_name: format!(
                        "Implementation for trait '{}' not registered",
                        std::any::type_name::<T>()
                    ),
                },
                other => other,
            })?;

        // The caster returns an Arc<dyn Any> which holds an Arc<T>.
        let wrapper = caster(instance)
            .ok_or_else(ServiceError::downcast_failed::<T>)?
            .downcast::<Arc<T>>()
            .map_err(|_| ServiceError::downcast_failed::<T>())?;
        Ok(wrapper.as_ref().clone())
    }

    fn resolve_any(&self, type_id: TypeId, requested: &str) -> Result<AnyArc> {
        // Clone the entry out so no map guard is held while a factory runs;
        // factories re-enter the resolver for their own dependencies.
        let (registered, kind) = self
            .inner
            .services
            .get(&type_id)
            .map(|entry| (entry.type_name, entry.kind.clone()))
            .ok_or_else(|| ServiceError::ServiceNotFound {
                type_name: requested.to_string(),
            })?;

        // Factory faults name the registered type, which for trait lookups
        // is the implementation rather than the trait
        let factory_failed = |source: anyhow::Error| ServiceError::FactoryFailed {
            type_name: registered.to_string(),
            source,
        };

        match kind {
            ServiceKind::Instance(instance) => Ok(instance),
            ServiceKind::Factory {
                lifetime: ServiceLifetime::Singleton,
                factory,
            } => {
                if let Some(cached) = self.inner.singletons.get(&type_id) {
                    return Ok(Arc::clone(cached.value()));
                }
                // Singletons never see the requesting scope
                let root = ServiceResolver::new(self.inner, None);
                let created = factory(&root).map_err(factory_failed)?;
                Ok(Arc::clone(
                    self.inner.singletons.entry(type_id).or_insert(created).value(),
                ))
            }
            ServiceKind::Factory {
                lifetime: ServiceLifetime::Scoped,
                factory,
            } => {
                let cache = self.scope.ok_or_else(|| ServiceError::ScopeMismatch {
                    message: format!("scoped service {} requested outside of a scope", registered),
                })?;
                if let Some(cached) = cache.get(&type_id) {
                    return Ok(Arc::clone(cached.value()));
                }
                let created = factory(self).map_err(factory_failed)?;
                Ok(Arc::clone(cache.entry(type_id).or_insert(created).value()))
            }
            ServiceKind::Factory {
                lifetime: ServiceLifetime::Transient,
                factory,
            } => factory(self).map_err(factory_failed),
        }
    }
}

/// Frozen, thread-safe service resolver built from a
/// [`ServiceRegistry`](crate::di::ServiceRegistry).
///
/// Handed to modules through the shared context during the initialize and
/// shutdown phases.
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    pub(crate) fn from_inner(inner: ProviderInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    fn resolver(&self) -> ServiceResolver<'_> {
        ServiceResolver::new(&self.inner, None)
    }

    pub fn get_required_service<T: 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        self.resolver().get_required_service::<T>()
    }

    pub fn get_service<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        self.resolver().get_service::<T>()
    }

    pub fn get_trait<T: ?Sized + 'static + Send + Sync>(&self) -> Result<Arc<T>> {
        self.resolver().get_trait::<T>()
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.inner.services.contains_key(&type_id) || self.inner.trait_mappings.contains_key(&type_id)
    }

    /// Open a new scope; scoped services are cached per scope
    pub fn create_scope(&self) -> ServiceScope {
        ServiceScope::new(Arc::clone(&self.inner))
    }

    /// Release every instance this provider owns.
    ///
    /// Subsequent lookups (including from open scopes) fail with
    /// [`ServiceError::ProviderDisposed`]. Returns `false` if the provider
    /// was already disposed.
    pub fn dispose(&self) -> bool {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let released = self.inner.singletons.len() + self.inner.services.len();
        self.inner.singletons.clear();
        self.inner.services.clear();
        self.inner.casters.clear();
        self.inner.trait_mappings.clear();
        tracing::debug!("Service provider disposed ({} entries released)", released);
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use crate::di::ServiceRegistry;
    use crate::error::ServiceError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(usize);

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_singleton_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let mut registry = ServiceRegistry::new();
        registry.add_singleton(move |_| {
            Ok(Counter(counted.fetch_add(1, Ordering::SeqCst)))
        });
        let provider = registry.build();

        let first = provider.get_required_service::<Counter>().unwrap();
        let second = provider.get_required_service::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_factory_runs_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);

        let mut registry = ServiceRegistry::new();
        registry.add_transient(move |_| Ok(Counter(counted.fetch_add(1, Ordering::SeqCst))));
        let provider = registry.build();

        assert_eq!(provider.get_required_service::<Counter>().unwrap().0, 0);
        assert_eq!(provider.get_required_service::<Counter>().unwrap().0, 1);
    }

    #[test]
    fn test_factory_resolves_its_dependencies() {
        struct Prefix(&'static str);
        struct Message(String);

        let mut registry = ServiceRegistry::new();
        registry.add_instance(Prefix(">>"));
        registry.add_singleton(|resolver| {
            let prefix = resolver.get_required_service::<Prefix>()?;
            Ok(Message(format!("{} ready", prefix.0)))
        });

        let provider = registry.build();
        assert_eq!(provider.get_required_service::<Message>().unwrap().0, ">> ready");
    }

    #[test]
    fn test_missing_service() {
        let provider = ServiceRegistry::new().build();
        assert!(provider.get_service::<Counter>().is_none());
        assert!(matches!(
            provider.get_required_service::<Counter>(),
            Err(ServiceError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_factory_failure_is_reported() {
        let mut registry = ServiceRegistry::new();
        registry.add_singleton::<Counter, _>(|_| Err(anyhow::anyhow!("no counter today")));
        let provider = registry.build();

        let err = provider.get_required_service::<Counter>().err().unwrap();
        assert!(matches!(
            &err,
            ServiceError::FactoryFailed { type_name, .. } if type_name.ends_with("Counter")
        ));
        assert!(err.to_string().contains("no counter today"));
    }

    #[test]
    fn test_resolve_trait() {
        let mut registry = ServiceRegistry::new();
        registry.add_instance(English);
        registry.bind::<dyn Greeter, English, _>(|i| i as Arc<dyn Greeter>);
        let provider = registry.build();

        assert_eq!(provider.get_trait::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(provider.contains::<dyn Greeter>());
    }

    #[test]
    fn test_trait_factory_failure_names_implementation() {
        let mut registry = ServiceRegistry::new();
        registry.add_singleton::<English, _>(|_| Err(anyhow::anyhow!("no dictionary")));
        registry.bind::<dyn Greeter, English, _>(|i| i as Arc<dyn Greeter>);
        let provider = registry.build();

        match provider.get_trait::<dyn Greeter>() {
            Err(ServiceError::FactoryFailed { type_name, .. }) => {
                assert!(type_name.ends_with("English"));
            }
            other => panic!("expected factory failure, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_trait_without_implementation() {
        let mut registry = ServiceRegistry::new();
        registry.bind::<dyn Greeter, English, _>(|i| i as Arc<dyn Greeter>);
        let provider = registry.build();

        assert!(matches!(
            provider.get_trait::<dyn Greeter>(),
            Err(ServiceError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_scoped_service_outside_scope() {
        let mut registry = ServiceRegistry::new();
        registry.add_scoped(|_| Ok(Counter(0)));
        let provider = registry.build();

        assert!(matches!(
            provider.get_required_service::<Counter>(),
            Err(ServiceError::ScopeMismatch { .. })
        ));
    }

    #[test]
    fn test_dispose_releases_instances() {
        let shared = Arc::new(Counter(7));
        let mut registry = ServiceRegistry::new();
        registry.add_shared(Arc::clone(&shared));
        let provider = registry.build();
        drop(registry);

        assert_eq!(Arc::strong_count(&shared), 2);
        assert!(provider.dispose());
        assert!(!provider.dispose());
        assert_eq!(Arc::strong_count(&shared), 1);
        assert!(matches!(
            provider.get_required_service::<Counter>(),
            Err(ServiceError::ProviderDisposed { .. })
        ));
    }
}
