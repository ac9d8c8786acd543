use modhost::prelude::*;
use modhost::{LifecyclePhase, ModuleState};
use std::sync::Mutex;

type Log = Arc<Mutex<Vec<String>>>;

const LOG: &str = "log";

/// Append `phase:name` to the shared log, failing when the configuration
/// has `fail:<name>` set to this phase.
fn record(ctx: &mut ModuleContext, phase: &str, name: &str) -> ModuleResult {
    if let Some(log) = ctx.property::<Log>(LOG) {
        log.lock().unwrap().push(format!("{}:{}", phase, name));
    }
    if ctx.configuration().get(&format!("fail:{}", name)).as_deref() == Some(phase) {
        anyhow::bail!("{} failed to {}", name, phase);
    }
    Ok(())
}

macro_rules! recording_module {
    ($ty:ident) => {
        impl Module for $ty {
            fn configure_services(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
                record(ctx, "configure", stringify!($ty))
            }

            fn initialize(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
                record(ctx, "initialize", stringify!($ty))
            }

            fn shutdown(&mut self, ctx: &mut ModuleContext) -> ModuleResult {
                record(ctx, "shutdown", stringify!($ty))
            }
        }
    };
}

#[module]
#[derive(Default)]
struct A;
recording_module!(A);

#[module(dependencies = [A])]
#[derive(Default)]
struct B;
recording_module!(B);

#[module(dependencies = [A, B])]
#[derive(Default)]
struct C;
recording_module!(C);

fn entries(log: &Log, phase: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|e| e.strip_prefix(&format!("{}:", phase)).map(str::to_string))
        .collect()
}

fn builder(log: &Log) -> HostBuilder {
    Host::builder()
        .environment("Test")
        .property(LOG, Arc::clone(log))
}

fn failing(log: &Log, module: &str, phase: &str) -> HostBuilder {
    let config = Configuration::new();
    config.set(&format!("fail:{}", module), phase);
    builder(log).configuration(config)
}

#[test]
fn test_build_runs_phases_in_dependency_order() {
    let log = Log::default();
    let host = builder(&log).root_module::<C>().unwrap().build().unwrap();

    assert_eq!(entries(&log, "configure"), vec!["A", "B", "C"]);
    assert_eq!(entries(&log, "initialize"), vec!["A", "B", "C"]);

    let names: Vec<&str> = host.modules().iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    for module in host.modules() {
        assert_eq!(module.state(), ModuleState::Initialized);
        assert!(module.loaded_at().is_some());
        assert!(module.initialized_at().is_some());
    }
    assert_eq!(host.environment(), "Test");
}

#[test]
fn test_dispose_shuts_down_in_reverse_order_once() {
    let log = Log::default();
    let mut host = builder(&log).root_module::<C>().unwrap().build().unwrap();

    let report = host.dispose();
    assert!(report.is_clean());
    assert_eq!(report.stopped, vec!["C", "B", "A"]);
    assert_eq!(entries(&log, "shutdown"), vec!["C", "B", "A"]);

    let again = host.dispose();
    assert_eq!(again.attempted(), 0);
    assert!(host.is_disposed());
    assert_eq!(entries(&log, "shutdown").len(), 3);
}

#[test]
fn test_drop_disposes_host() {
    let log = Log::default();
    {
        let _host = builder(&log).root_module::<B>().unwrap().build().unwrap();
    }
    assert_eq!(entries(&log, "shutdown"), vec!["B", "A"]);
}

#[test]
fn test_configure_failure_aborts_build() {
    let log = Log::default();
    let err = failing(&log, "B", "configure")
        .root_module::<C>()
        .unwrap()
        .build()
        .unwrap_err();

    match err {
        LifecycleError::ModuleFailed { module, phase, .. } => {
            assert_eq!(module, "B");
            assert_eq!(phase, LifecyclePhase::ConfigureServices);
        }
        other => panic!("expected module failure, got {}", other),
    }
    assert_eq!(entries(&log, "configure"), vec!["A", "B"]);
    assert!(entries(&log, "initialize").is_empty());
}

#[test]
fn test_initialize_failure_rolls_back_started_modules() {
    let log = Log::default();
    let err = failing(&log, "C", "initialize")
        .root_module::<C>()
        .unwrap()
        .build()
        .unwrap_err();

    assert!(err.to_string().contains("C failed to initialize"));
    assert_eq!(entries(&log, "initialize"), vec!["A", "B", "C"]);
    assert_eq!(entries(&log, "shutdown"), vec!["B", "A"]);
}

#[test]
fn test_shutdown_fault_does_not_stop_other_modules() {
    let log = Log::default();
    let mut host = failing(&log, "B", "shutdown")
        .root_module::<C>()
        .unwrap()
        .build()
        .unwrap();

    let report = host.dispose();
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].module, "B");
    assert_eq!(entries(&log, "shutdown"), vec!["C", "B", "A"]);

    let states: Vec<ModuleState> = host.modules().iter().map(|m| m.state()).collect();
    assert_eq!(
        states,
        vec![ModuleState::ShutDown, ModuleState::Error, ModuleState::ShutDown]
    );
}

#[test]
fn test_second_root_module_is_rejected() {
    let log = Log::default();
    let result = builder(&log).root_module::<A>().unwrap().root_module::<B>();

    assert!(matches!(
        result,
        Err(LifecycleError::RootModuleAlreadyDeclared { .. })
    ));
}

#[test]
fn test_loading_twice_keeps_one_descriptor() {
    let log = Log::default();
    let host = builder(&log)
        .root_module::<C>()
        .unwrap()
        .load_module::<A>()
        .unwrap()
        .load_module::<B>()
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(host.modules().len(), 3);
    assert_eq!(entries(&log, "configure"), vec!["A", "B", "C"]);
}

#[module(dependencies = [Y])]
#[derive(Default)]
struct X;
impl Module for X {}

#[module(dependencies = [X])]
#[derive(Default)]
struct Y;
impl Module for Y {}

#[test]
fn test_cycle_is_reported_before_any_phase() {
    let err = Host::builder().root_module::<X>().unwrap().build().unwrap_err();

    match err {
        LifecycleError::CircularDependency { path } => {
            assert!(path.contains(&"X".to_string()));
            assert!(path.contains(&"Y".to_string()));
            assert_eq!(path.first(), path.last());
        }
        other => panic!("expected circular dependency, got {}", other),
    }
}

#[tokio::test]
async fn test_run_until_disposes_after_signal() {
    let log = Log::default();
    let host = builder(&log).root_module::<C>().unwrap().build().unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let waiter = tokio::spawn(host.run_until(async move {
        let _ = rx.await;
    }));

    assert!(entries(&log, "shutdown").is_empty());
    tx.send(()).unwrap();

    let report = waiter.await.unwrap();
    assert_eq!(report.stopped, vec!["C", "B", "A"]);
}
