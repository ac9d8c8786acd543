use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Faults raised by the service registry and its resolvers
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Service not found: {type_name}")]
    ServiceNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Scope mismatch: {message}")]
    ScopeMismatch { message: String },

    #[error("Service provider has been disposed; cannot resolve {type_name}")]
    ProviderDisposed { type_name: String },

    #[error("Factory for {type_name} failed: {source}")]
    FactoryFailed {
        type_name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    pub(crate) fn not_found<T: ?Sized>() -> Self {
        Self::ServiceNotFound {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    pub(crate) fn downcast_failed<T: ?Sized>() -> Self {
        Self::DowncastFailed {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }

    pub(crate) fn disposed<T: ?Sized>() -> Self {
        Self::ProviderDisposed {
            type_name: std::any::type_name::<T>().to_string(),
        }
    }
}
