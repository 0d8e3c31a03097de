use tracing_subscriber::EnvFilter;

/// Parses `RUST_LOG`-style directives, falling back to `info` when absent or invalid.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the stderr subscriber. Call after the dotenv files are loaded so a
/// `RUST_LOG` set there is honoured.
pub fn init_logging(directives: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_from_config_are_used() {
        let filter = log_filter(Some("cricket_insights=debug")).to_string();
        assert!(filter.contains("cricket_insights"));
        assert!(filter.contains("debug"));
    }

    #[test]
    fn missing_or_bad_directives_fall_back_to_info() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("cricket_insights=loud")).to_string(), "info");
    }
}
