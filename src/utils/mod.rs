use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with the default directive.
pub fn init_tracing() {
    init_tracing_with(&Config::default_log_filter());
}

/// Initializes the global tracing subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init_tracing_with(default_directive: &str) {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));
        let _ = fmt().with_env_filter(filter).try_init();
        tracing::info!("Shared Finance tracing initialized.");
    });
}

pub fn tracing_initialized() -> bool {
    TRACING_INIT.is_completed()
}
