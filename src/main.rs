use anyhow::{Context, Result};
use labelpipe::cli::commands::{LocateCommand, RunFlags};
use labelpipe::cli::output::*;
use labelpipe::cli::{Cli, Command};
use labelpipe::core::RunnerConfig;
use labelpipe::execution::{
    verify_pipeline, FileVerifier, PipelineBuilder, PipelineExecutor, PipelineRequest,
};
use labelpipe::process::{ProcessRunner, RunOptions, ToolLocator};
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    let config = RunnerConfig::load(cli.config.as_deref()).context("Failed to load runner config")?;

    match &cli.command {
        Command::Register(cmd) => {
            run_request(PipelineRequest::Register(cmd.to_params()), &cmd.run, config).await?
        }
        Command::Combine(cmd) => {
            run_request(PipelineRequest::Combine(cmd.to_params()), &cmd.run, config).await?
        }
        Command::Locate(cmd) => locate_tools(cmd, &config)?,
    }

    Ok(())
}

async fn run_request(request: PipelineRequest, flags: &RunFlags, mut config: RunnerConfig) -> Result<()> {
    flags.apply(&mut config);
    config.validate()?;

    let mut locator = ToolLocator::from_config(&config);
    let spec = match PipelineBuilder::new(&mut locator, config.tools.clone()).build(&request) {
        Ok(spec) => spec,
        Err(e) => {
            println!("{} Cannot build pipeline:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    };

    for tool in spec.unresolved_tools() {
        warn!("{} was not found; its stage will fail to start", tool.name());
    }

    if flags.dry_run {
        if flags.json {
            println!("{}", serde_json::to_string_pretty(&spec)?);
        } else {
            println!("{}", format_plan(&spec));
        }
        return Ok(());
    }

    let runner = ProcessRunner::new(RunOptions::from(&config));
    let mut executor = PipelineExecutor::new(runner).with_policy(config.failure_policy);

    let spinner = Arc::new(SpinnerProgress::new());
    if config.emit_progress && !flags.json {
        executor = executor.with_progress(spinner.clone());
    }
    if !flags.json {
        let printer = spinner.clone();
        executor.add_event_handler(move |event| printer.println(&format_execution_event(event)));
    }

    let result = executor.execute(&spec).await;
    spinner.finish();

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    // Stage exit codes are advisory; the produced artifact decides the outcome
    match verify_pipeline(&FileVerifier, &spec) {
        Ok(artifact) => {
            if !flags.json {
                println!(
                    "\n{} {} produced {} in {}",
                    CHECK,
                    style(spec.name()).bold(),
                    style(artifact.display()).green(),
                    format_duration(result.duration())
                );
            }
            if !result.success {
                warn!("{} stage(s) reported failure but the output was produced", result.failures().len());
            }
            Ok(())
        }
        Err(e) => {
            if !flags.json {
                println!(
                    "\n{} {} {} after {}",
                    CROSS,
                    style(spec.name()).bold(),
                    style("failed").red(),
                    format_duration(result.duration())
                );
            }
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn locate_tools(cmd: &LocateCommand, config: &RunnerConfig) -> Result<()> {
    let mut locator = ToolLocator::from_config(config);
    let names = if cmd.tools.is_empty() {
        vec![
            config.tools.registration.clone(),
            config.tools.resample.clone(),
            config.tools.label_combine.clone(),
        ]
    } else {
        cmd.tools.clone()
    };

    println!("{} Searching {} director(ies)", INFO, locator.search_dirs().len());

    let mut missing = 0;
    for name in &names {
        let tool = locator.resolve(name);
        match tool.path() {
            Some(path) => println!("  {}{} {}", CHECK, style(name).bold(), style(path.display()).dim()),
            None => {
                missing += 1;
                println!("  {}{} {}", CROSS, style(name).bold(), style("not found").red());
            }
        }
    }

    if missing > 0 {
        std::process::exit(1);
    }
    Ok(())
}
