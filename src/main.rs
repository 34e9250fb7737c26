//! Insurance pipeline - Main Entry Point

use clap::Parser;
use insurance_pipeline::cli::{cmd_info, cmd_run, resolve_config, Cli, Commands, RunOverrides};
use insurance_pipeline::PipelineError;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "insurance_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            // exit 2 when the quality gate rejected the model
            let rejected = err
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_rejection);
            if rejected {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            data,
            config,
            test_fraction,
            split_seed,
            trials,
            rmse_threshold,
            cv_folds,
            sampler,
            output,
            report,
        } => {
            let overrides = RunOverrides {
                data,
                test_fraction,
                split_seed,
                trials,
                rmse_threshold,
                cv_folds,
                sampler,
            };
            let config = resolve_config(config.as_deref(), overrides)?;
            cmd_run(config, output.as_deref(), report.as_deref())?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }
    Ok(())
}
