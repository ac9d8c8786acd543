use crate::di::provider::{ProviderInner, ScopeCache, ServiceResolver};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A resolution scope created from a [`ServiceProvider`](crate::di::ServiceProvider).
///
/// Scoped services are created once per scope and released when the scope
/// is dropped. Singletons and instances are shared with the root provider.
pub struct ServiceScope {
    id: Uuid,
    root: Arc<ProviderInner>,
    cache: ScopeCache,
}

impl ServiceScope {
    pub(crate) fn new(root: Arc<ProviderInner>) -> Self {
        let id = Uuid::new_v4();
        tracing::trace!("Opened service scope {}", id);
        Self {
            id,
            root,
            cache: DashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn resolver(&self) -> ServiceResolver<'_> {
        ServiceResolver::new(&self.root, Some(&self.cache))
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
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        tracing::trace!(
            "Closing service scope {} ({} scoped instances)",
            self.id,
            self.cache.len()
        );
    }
}
