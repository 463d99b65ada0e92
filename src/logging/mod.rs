//! Tracing setup.
//!
//! Every component logs through `tracing` with structured fields
//! (`region`, `group`, `node_id`, `attempt`, ...). This module turns a
//! [`LoggingConfig`] into a subscriber.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build filter directives string from LoggingConfig
///
/// The base level comes first, followed by one `stratus::<component>=<level>`
/// directive per configured component.
///
/// # Examples
///
/// ```
/// use stratus::config::logging::{LogFormat, LoggingConfig};
/// use stratus::logging::build_filter_directives;
/// use std::collections::BTreeMap;
///
/// let mut component_levels = BTreeMap::new();
/// component_levels.insert("reaper".to_string(), "debug".to_string());
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(component_levels),
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,stratus::reaper=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        for (component, level) in component_levels {
            filter_str.push_str(&format!(",stratus::{}={}", component, level));
        }
    }

    filter_str
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured directives when set. Fails if a
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter_str = build_filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // Logs go to stderr so command output stays parseable.
    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_filter_directives_base_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn test_filter_directives_components_sorted() {
        let mut levels = BTreeMap::new();
        levels.insert("reaper".to_string(), "debug".to_string());
        levels.insert("poll".to_string(), "trace".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..Default::default()
        };

        assert_eq!(
            build_filter_directives(&config),
            "info,stratus::poll=trace,stratus::reaper=debug"
        );
    }

    #[test]
    fn test_filter_directives_parse() {
        let mut levels = BTreeMap::new();
        levels.insert("compute".to_string(), "debug".to_string());
        let config = LoggingConfig {
            component_levels: Some(levels),
            ..Default::default()
        };

        assert!(EnvFilter::try_new(build_filter_directives(&config)).is_ok());
    }
}
