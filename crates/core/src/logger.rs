//! Process-wide `tracing` subscriber setup.
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn parse_level(log_level: &str) -> Option<tracing::Level> {
    match log_level.to_lowercase().as_str() {
        "trace" => Some(tracing::Level::TRACE),
        "debug" => Some(tracing::Level::DEBUG),
        "info" => Some(tracing::Level::INFO),
        "warn" => Some(tracing::Level::WARN),
        "error" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `log_level`. Unknown levels fall back to `info`.
///
/// Calling it again after a subscriber is installed has no effect.
pub fn init_logger(log_level: &str) {
    let level = parse_level(log_level);

    let installed = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(level.unwrap_or(tracing::Level::INFO).to_string())
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok();

    if installed && level.is_none() {
        warn!("Invalid log level '{}', defaulting to 'info'", log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("warn"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_init_logger_twice() {
        init_logger("debug");
        init_logger("nonsense");
    }
}
