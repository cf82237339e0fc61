//! Environment-driven configuration. These tests touch process-wide
//! environment variables and run serially.

use pathtrace::{
    ExecutionUnitId, ManualClock, MemorySink, RootFactory, ScopedStore, TotalBasis, TraceConfig,
    Tracer,
};
use serial_test::serial;
use std::sync::Arc;

struct EnvGuard(&'static [&'static str]);

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in self.0 {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn env_overrides_defaults() {
    let _guard = EnvGuard(&["PATHTRACE_MAX_DEPTH", "PATHTRACE_DEFAULT_CONTEXT"]);
    std::env::set_var("PATHTRACE_MAX_DEPTH", "2");
    std::env::set_var("PATHTRACE_DEFAULT_CONTEXT", "main");

    let mut config = TraceConfig::default();
    config.merge_with_env().unwrap();
    config.validate().unwrap();
    assert_eq!(config.max_depth, 2);
    assert_eq!(config.default_context, "main");

    let tracer = Tracer::with_factory(
        ScopedStore::new().scope(ExecutionUnitId::new()),
        RootFactory::new()
            .config(config)
            .clock(Arc::new(ManualClock::new(0)))
            .sink(Arc::new(MemorySink::new())),
    );
    for name in ["a", "b", "c", "d"] {
        tracer.enter_default(name).unwrap();
    }
    assert_eq!(tracer.state("main").depth(), 3);
}

#[test]
#[serial]
fn invalid_env_value_is_reported() {
    let _guard = EnvGuard(&["PATHTRACE_TOTAL_BASIS"]);
    std::env::set_var("PATHTRACE_TOTAL_BASIS", "median");

    let mut config = TraceConfig::default();
    let err = config.merge_with_env().unwrap_err();
    assert!(err.to_string().contains("median"), "{err}");
    assert_eq!(config.total_basis, TotalBasis::FirstSorted);
}

#[test]
#[serial]
fn zero_depth_fails_validation() {
    let _guard = EnvGuard(&["PATHTRACE_MAX_DEPTH"]);
    std::env::set_var("PATHTRACE_MAX_DEPTH", "0");

    let mut config = TraceConfig::default();
    config.merge_with_env().unwrap();
    assert!(config.validate().is_err());
}
