use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "VINEGAR_LOG";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize structured logging for a stand-alone binary.
/// Set VINEGAR_LOG=debug (or trace, info, warn, error) for verbosity control.
pub fn init_logging() {
    fmt()
        .with_env_filter(filter_or("info"))
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize logging from inside a library loaded into a foreign process.
///
/// Uses `try_init` so a subscriber already installed by the host (or by an
/// earlier call) is left alone. Defaults to `warn` to stay quiet in games.
pub fn init_layer_logging() {
    let _ = fmt()
        .with_env_filter(filter_or("warn"))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_logging_is_reentrant() {
        init_layer_logging();
        init_layer_logging();
        tracing::warn!("still alive after double init");
    }
}
