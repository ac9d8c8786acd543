mod provider;
mod registry;
mod scope;

pub use provider::{ServiceProvider, ServiceResolver};
pub use registry::{ServiceLifetime, ServiceRegistry};
pub use scope::ServiceScope;
