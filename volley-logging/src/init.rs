use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use volley_config::{LogFormat, LoggingConfig};

/// Build the filter for `config`: the configured level plus any extra
/// directives, or `info` if a directive does not parse.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut spec = config.level.to_string();
    for directive in &config.directives {
        spec.push(',');
        spec.push_str(directive.trim());
    }

    EnvFilter::try_new(&spec).unwrap_or_else(|e| {
        eprintln!("Ignoring log directives '{}': {}", spec, e);
        EnvFilter::new("info")
    })
}

/// Filter from a `RUST_LOG` value, if it is set and parses
fn env_override(rust_log: Option<&str>) -> Option<EnvFilter> {
    let spec = rust_log.map(str::trim).filter(|spec| !spec.is_empty())?;
    match EnvFilter::try_new(spec) {
        Ok(filter) => Some(filter),
        Err(e) => {
            eprintln!("Ignoring RUST_LOG '{}': {}", spec, e);
            None
        }
    }
}

/// Initialize logging from configuration.
///
/// A valid `RUST_LOG` replaces the configured filter. Logs go to stderr so
/// stdout carries only the run summary. Initializing twice is not an error;
/// the first subscriber stays installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_override(rust_log.as_deref()).unwrap_or_else(|| build_filter(config));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize plain text logging at `log_level`
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let level = log_level
        .parse()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Cannot initialize logging at level '{}'", log_level))?;

    init_logging(&LoggingConfig {
        level,
        ..LoggingConfig::default()
    })
}
