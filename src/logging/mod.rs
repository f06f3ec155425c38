use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` is honored; the configured level is added on top for the
/// crate's own target. Calling this twice is a no-op.
pub fn init(config: &LoggingConfig) {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = config.level.directive().parse() {
        filter = filter.add_directive(directive);
    }

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Whole milliseconds for a log field, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
