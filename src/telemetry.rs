use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// JSON logs for CloudWatch. `RUST_LOG` wins; otherwise `info`.
/// Safe to call twice (second call is a no-op).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_target(true).without_time())
        .try_init();
}
