use std::sync::Once;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "kharch=info,kharch_core=info,kharch_storage_json=info";

/// Initializes the global tracing subscriber, logging to stderr.
///
/// `RUST_LOG` overrides the default filter, which logs the kharch crates at info.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

        // another subscriber may already be installed by an embedding process
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
