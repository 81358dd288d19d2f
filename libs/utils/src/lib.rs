use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG`, when set, wins over `env_filter`.
pub fn set_log(env_filter: String) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter)),
        )
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}

/// Maps the count of `-v` flags to a level. `None` keeps the configured one.
pub fn verbose_level(verbose: u8) -> Option<Level> {
    match verbose {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Builds a filter that applies `level` to each of `targets`.
pub fn filter_for(targets: &[&str], level: &str) -> String {
    targets
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_level() {
        assert_eq!(verbose_level(0), None);
        assert_eq!(verbose_level(2), Some(Level::DEBUG));
        assert_eq!(verbose_level(9), Some(Level::TRACE));
    }

    #[test]
    fn test_filter_for() {
        assert_eq!(filter_for(&["flvrec", "flv"], "debug"), "flvrec=debug,flv=debug");
    }
}
