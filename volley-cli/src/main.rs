use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use volley_logging::{init_logging, init_simple_tracing};

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands};
use commands::{config, list, plan, run, Overrides};

/// Exit status when the run completed but crossed a threshold
const THRESHOLDS_CROSSED: u8 = 99;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Commands::Run {
            workload,
            scenario,
            base_url,
            params,
            json,
        }) => {
            let config = commands::load_config(
                config_path,
                Overrides {
                    log_level: cli.log_level,
                    base_url,
                    scenario,
                    workload,
                    params,
                },
            )?;
            init_logging(&config.logging)?;

            let workload = commands::workload_name(&config)?;
            let summary = run::run_workload(&config, workload).await?;
            run::print_summary(&summary, json)?;

            if summary.passed() {
                info!("All thresholds passed");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(THRESHOLDS_CROSSED))
            }
        }
        Some(Commands::Plan { workload, scenario }) => {
            let config = commands::load_config(
                config_path,
                Overrides {
                    log_level: cli.log_level,
                    scenario,
                    workload,
                    ..Overrides::default()
                },
            )?;
            init_logging(&config.logging)?;

            plan::print_plan(&config, commands::workload_name(&config)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config { config_cmd }) => {
            init_simple_tracing(cli.log_level.as_deref().unwrap_or("warn"))?;

            match config_cmd {
                ConfigCommands::Sample { output, force } => {
                    config::handle_config_sample(output.as_deref(), force)?
                }
                ConfigCommands::Validate { config_file } => {
                    config::handle_config_validate(&config_file)?
                }
                ConfigCommands::Show { format } => {
                    let effective = commands::load_config(config_path, Overrides::default())?;
                    config::handle_config_show(&effective, &format)?
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::List) | None => {
            list::list_workloads();
            Ok(ExitCode::SUCCESS)
        }
    }
}
