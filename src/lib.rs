pub mod commands;
pub mod config;
pub mod core_state;
pub mod in_flight; // Single-flight gates per pipeline
pub mod pipeline;
pub mod preferences; // Accent colour persistence
pub mod speech;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the built-in filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
