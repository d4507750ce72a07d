use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PGN_REPLAY_LOG";
const DEFAULT_DIRECTIVE: &str = "warn";

static INIT: OnceLock<()> = OnceLock::new();

fn filter_from(raw: Option<&str>) -> EnvFilter {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directive) => {
            EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
        }
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

/// Installs the stderr subscriber, filtered by `PGN_REPLAY_LOG`.
/// Later calls (or an already installed global subscriber) are ignored.
pub fn init() {
    INIT.get_or_init(|| {
        let raw = std::env::var(LOG_ENV).ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_from(raw.as_deref()))
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_warn() {
        assert_eq!(filter_from(None).to_string(), "warn");
        assert_eq!(filter_from(Some("  ")).to_string(), "warn");
    }

    #[test]
    fn test_filter_accepts_directive() {
        assert_eq!(filter_from(Some("debug")).to_string(), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}
