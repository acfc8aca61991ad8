//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one scenario of a workload against the target
    Run {
        /// Workload to run (see `volley list`)
        #[arg(long, value_name = "NAME")]
        workload: Option<String>,

        /// Scenario (profile) to keep, e.g. smoke, load, stress
        #[arg(long, value_name = "NAME")]
        scenario: Option<String>,

        /// Base URL of the backend under test
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,

        /// Workload parameter (example: --param MODIFY_TIMES=5)
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the built-in workloads and their scenarios
    List,

    /// Print the pruned execution plan of a workload as YAML
    Plan {
        /// Workload to plan
        #[arg(long, value_name = "NAME")]
        workload: Option<String>,

        /// Scenario (profile) to keep
        #[arg(long, value_name = "NAME")]
        scenario: Option<String>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print a sample configuration file
    Sample {
        /// Write to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Show the effective configuration (file plus environment overrides)
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}

/// Parse a `KEY=VALUE` workload parameter
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("parameter name is empty in '{}'", raw));
    }

    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("MODIFY_TIMES=5").unwrap(),
            ("MODIFY_TIMES".to_string(), "5".to_string())
        );
        assert_eq!(
            parse_param("FILTER=a=b").unwrap(),
            ("FILTER".to_string(), "a=b".to_string())
        );
        assert!(parse_param("MODIFY_TIMES").is_err());
        assert!(parse_param("=5").is_err());
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::try_parse_from([
            "volley",
            "--log-level",
            "debug",
            "run",
            "--workload",
            "comment-modify-burst",
            "--scenario",
            "load",
            "--param",
            "MODIFY_TIMES=5",
            "--param",
            "STRICT_200=1",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Some(Commands::Run {
                workload,
                scenario,
                params,
                json,
                ..
            }) => {
                assert_eq!(workload.as_deref(), Some("comment-modify-burst"));
                assert_eq!(scenario.as_deref(), Some("load"));
                assert_eq!(params.len(), 2);
                assert!(json);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["volley", "list", "--config", "volley.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("volley.yaml")));
        assert!(matches!(cli.command, Some(Commands::List)));
    }

    #[test]
    fn test_bad_param_is_rejected() {
        assert!(Cli::try_parse_from(["volley", "run", "--param", "oops"]).is_err());
    }
}
