use modhost::prelude::*;
use std::sync::Mutex;

/// In-memory key/value store shared by the demo modules
#[derive(Default)]
pub struct Store {
    entries: Mutex<Vec<(String, String)>>,
}

impl Store {
    pub fn put(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((key.to_string(), value.to_string()));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

#[module(name = "Storage", priority = 100)]
#[derive(Default)]
pub struct StorageModule;

impl Module for StorageModule {
    fn configure_services(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        ctx.services_mut().add_singleton(|_| Ok(Store::default()));
        Ok(())
    }

    fn shutdown(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        let store = ctx.service_provider()?.get_required_service::<Store>()?;
        tracing::info!("Flushing {} entries", store.len());
        Ok(())
    }
}

#[module(dependencies = [StorageModule], name = "Seeder")]
#[derive(Default)]
pub struct SeedModule;

impl Module for SeedModule {
    fn initialize(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        let store = ctx.service_provider()?.get_required_service::<Store>()?;
        store.put("environment", ctx.environment());
        store.put("seeded_at", &chrono::Utc::now().to_rfc3339());
        Ok(())
    }
}

#[module(dependencies = [SeedModule, StorageModule])]
#[derive(Default)]
pub struct AppModule;

impl Module for AppModule {
    fn initialize(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
        for module in ctx.modules() {
            tracing::info!("  {} (priority {})", module.name, module.priority);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting bootstrap demo...");

    let host = Host::builder()
        .configuration(Configuration::from_env_prefixed("DEMO_"))
        .root_module::<AppModule>()?
        .build()?;

    tracing::info!(
        "Host running in {} with {} modules; press Ctrl+C to stop",
        host.environment(),
        host.modules().len()
    );

    let report = host.run_until_shutdown_signal().await;
    for fault in &report.faults {
        tracing::error!("{}", fault);
    }
    Ok(())
}
