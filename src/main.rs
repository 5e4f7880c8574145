// ABOUTME: Entry point for the bridgekeeper CLI application.
// ABOUTME: Parses arguments, sets up logging, and dispatches to command handlers.

mod cli;

use bridgekeeper::config::{self, Config};
use bridgekeeper::controller::Controller;
use bridgekeeper::error::{Error, Result};
use bridgekeeper::output::{Output, OutputMode};
use bridgekeeper::reconcile::{ReconcileError, Reconciler};
use bridgekeeper::runtime::{BollardRuntime, RuntimeError, RuntimeInfo, detect_local};
use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut output = Output::new(if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Normal
    });

    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        if let Some(hint) = e.hint() {
            output.hint(hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init { force } = cli.command {
        config::init_config(&cwd, cli.container.as_deref(), force)?;
        output.progress(&format!("Wrote {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config =
        Config::resolve(cli.config.as_deref(), &cwd)?.with_container(cli.container.as_deref());
    config.validate()?;
    init_tracing(cli.verbose, &config.log_level);

    match cli.command {
        Commands::Run => run_controller(&config).await,
        Commands::Scan => scan(&config, output).await,
        Commands::Plan => plan(&config, output).await,
        Commands::Init { .. } => Ok(()),
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug, else the configured level.
fn init_tracing(verbose: bool, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Detect the local runtime, connect, and make sure it answers.
async fn connect(config: &Config) -> Result<BollardRuntime> {
    let endpoint = detect_local(config.runtime.as_ref()).map_err(RuntimeError::from)?;
    tracing::info!(
        runtime = %endpoint.runtime_type,
        socket = %endpoint.socket_path,
        "connecting to container runtime"
    );
    let runtime = BollardRuntime::connect(&endpoint).map_err(RuntimeError::from)?;
    runtime.ping().await.map_err(RuntimeError::from)?;
    Ok(runtime)
}

async fn run_controller(config: &Config) -> Result<()> {
    let settings = config.reconcile_settings()?;
    let runtime = connect(config).await?;
    let cancel = CancellationToken::new();

    let mut controller = Controller::new(runtime, settings, config.reconnect_delay, cancel.clone());
    let mut task = tokio::spawn(async move { controller.run().await });

    let outcome = tokio::select! {
        joined = &mut task => joined,
        signal = wait_for_shutdown_signal() => {
            match signal {
                Ok(name) => tracing::info!(signal = name, "shutting down"),
                Err(e) => tracing::warn!(error = %e, "signal handling failed, shutting down"),
            }
            cancel.cancel();
            match tokio::time::timeout(config.shutdown_grace, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(
                        grace = ?config.shutdown_grace,
                        "in-flight pass did not finish in time"
                    );
                    task.abort();
                    return Ok(());
                }
            }
        }
    };

    match outcome {
        Ok(result) => result.map_err(Error::from),
        Err(e) => Err(Error::Task(e)),
    }
}

async fn scan(config: &Config, output: &mut Output) -> Result<()> {
    let settings = config.reconcile_settings()?;
    let runtime = connect(config).await?;
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Ok(name) = wait_for_shutdown_signal().await {
                tracing::info!(signal = name, "interrupting pass");
                cancel.cancel();
            }
        }
    });

    output.start_timer();
    let result = Reconciler::new(&runtime, &settings, cancel)
        .full_pass()
        .await;
    watcher.abort();

    match result {
        Ok(report) => {
            output.report(&report);
            Ok(())
        }
        Err(ReconcileError::Cancelled) => {
            output.progress("Interrupted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn plan(config: &Config, output: &Output) -> Result<()> {
    let settings = config.reconcile_settings()?;
    let runtime = connect(config).await?;
    let planned = Reconciler::new(&runtime, &settings, CancellationToken::new())
        .plan()
        .await?;
    output.plan(&planned.plan, planned.diagnostics.warnings());
    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
