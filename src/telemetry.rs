//! Tracing setup and span constructors.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `false` if a
/// subscriber was already installed (e.g. by the host application).
pub fn init(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
    result.is_ok()
}

/// Standardized span constructors for limiter observability.
pub mod spans {
    use tracing::{Span, debug_span, info_span};

    /// Span around an admission check.
    pub fn check(account_id: &str, action: &str) -> Span {
        debug_span!("check_action", account = %account_id, action = %action)
    }

    /// Span around recording an action outcome.
    pub fn record(account_id: &str, action: &str) -> Span {
        debug_span!("record_action", account = %account_id, action = %action)
    }

    /// Span around a snapshot write.
    pub fn persist(target: &str) -> Span {
        info_span!("persist", target = %target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        let config = LoggingConfig::default();
        let _ = init(&config);
        assert!(!init(&config));
    }
}
