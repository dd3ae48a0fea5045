//! Test helpers shared by the integration suites.

/// Initialize tracing once per test binary; respects `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
