use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the per-environment defaults. Production logs as
/// JSON for the log pipeline; everything else gets human-readable output
/// with file and line info in dev.
pub fn init_logging(env: &Environment) {
    let default_filter = match env {
        Environment::Dev => "civisource_backend=debug,tower_http=debug,info",
        Environment::Staging => "civisource_backend=debug,tower_http=info,info",
        Environment::Prod => "civisource_backend=info,tower_http=info,warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    if matches!(env, Environment::Prod) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.pretty())
            .init();
    }

    tracing::info!(env = ?env, "Logging initialized");
}
