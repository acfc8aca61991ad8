//! `volley config` subcommands

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;
use volley_config::{ConfigLoader, VolleyConfig};

const REDACTED: &str = "<redacted>";
const SECRET_FIELDS: [&str; 2] = ["access_token", "password"];

/// Print the sample configuration, or write it to `output`
pub fn handle_config_sample(output: Option<&Path>, force: bool) -> Result<()> {
    let sample = VolleyConfig::generate_sample();

    let Some(output) = output else {
        print!("{}", sample);
        return Ok(());
    };

    if output.exists() && !force {
        return Err(anyhow::anyhow!(
            "Output file already exists: {}. Use --force to overwrite.",
            output.display()
        ));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create output directory")?;
    }

    fs::write(output, sample)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Sample configuration written to {}", output.display());
    Ok(())
}

/// Load `config_file` with environment overrides and validate every domain
pub fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {}", config_file.display());

    if !config_file.exists() {
        return Err(anyhow::anyhow!(
            "Configuration file not found: {}",
            config_file.display()
        ));
    }

    ConfigLoader::new()
        .from_file(config_file)
        .with_context(|| format!("{} is invalid", config_file.display()))?;

    println!("Configuration file is valid");
    Ok(())
}

/// Print the effective configuration with secrets redacted
pub fn handle_config_show(config: &VolleyConfig, format: &str) -> Result<()> {
    let value = redacted(config)?;

    match format.to_lowercase().as_str() {
        "yaml" | "yml" => {
            let yaml = serde_yaml::to_string(&value).context("Failed to serialize to YAML")?;
            print!("{}", yaml);
        }
        "json" => {
            let json =
                serde_json::to_string_pretty(&value).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        other => {
            return Err(anyhow::anyhow!(
                "Unsupported format '{}'. Use yaml or json.",
                other
            ))
        }
    }
    Ok(())
}

fn redacted(config: &VolleyConfig) -> Result<Value> {
    let mut value = serde_json::to_value(config).context("Failed to serialize config")?;

    if let Some(target) = value.get_mut("target").and_then(Value::as_object_mut) {
        for field in SECRET_FIELDS {
            if let Some(secret) = target.get_mut(field) {
                *secret = Value::String(REDACTED.to_string());
            }
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_redaction() {
        let mut config = VolleyConfig::default();
        config.target.access_token = Some("secret-token".to_string());
        config.target.email = Some("qa@example.com".to_string());
        config.target.password = Some("hunter2".to_string());

        let value = redacted(&config).unwrap();
        let rendered = value.to_string();
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(value["target"]["access_token"], REDACTED);
        assert_eq!(value["target"]["email"], "qa@example.com");
    }

    #[test]
    fn test_absent_secrets_stay_absent() {
        let value = redacted(&VolleyConfig::default()).unwrap();
        assert!(value["target"].get("access_token").is_none());
    }

    #[test]
    fn test_sample_round_trips_through_validate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configs").join("volley.yaml");

        handle_config_sample(Some(&path), false).unwrap();
        handle_config_validate(&path).unwrap();

        assert!(handle_config_sample(Some(&path), false).is_err());
        handle_config_sample(Some(&path), true).unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "target:\n  base_url: ftp://nowhere\n").unwrap();

        assert!(handle_config_validate(&path).is_err());
        assert!(handle_config_validate(&dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_unknown_format() {
        assert!(handle_config_show(&VolleyConfig::default(), "toml").is_err());
    }
}
