//! offense-deck entry point.
//!
//! This binary is the composition root for the whole system:
//!
//! 1. **Parse configuration**: load `offense-deck.toml` (or `--config`),
//!    overlay secrets from the environment and validate it.
//! 2. **Wire observability**: `tracing-subscriber` with an `EnvFilter`, a human
//!    or JSON formatter and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the QRadar client, the Deck client and the
//!    file mapping store, injected into the [`Engine`].
//! 4. **Run**: one cycle with `--once`, otherwise a fixed-interval polling loop
//!    that stops on SIGINT or SIGTERM between cycles.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use deck::DeckClient;
use engine::{CycleReport, Engine};
use mapping_store::FileMappingStore;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use qradar::QRadarClient;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "offense-deck")]
#[command(version, about = "Mirrors QRadar offenses onto a Nextcloud Deck board")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, env = "OFFENSE_DECK_CONFIG", default_value = "offense-deck.toml")]
    config: PathBuf,

    /// Run a single reconciliation cycle and exit.
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "OFFENSE_DECK_LOG_JSON")]
    log_json: bool,

    /// Override `bridge.poll_interval_secs`.
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let tracer_provider = init_tracing(cli.log_json)?;

    let result = run(cli).await;
    if let Err(e) = &result {
        let chain = format!("{e:#}");
        error!(error = %chain, "offense-deck stopped");
    }

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            eprintln!("failed to flush traces: {e}");
        }
    }
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)?;
    info!(path = %cli.config.display(), "Loaded configuration");
    if config.source.accept_invalid_certs || config.board.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for at least one endpoint");
    }

    let mut engine = build_engine(&config)?;

    if cli.once {
        let report = engine.run_cycle().await?;
        log_report(&report);
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to render cycle report")?
        );
        return Ok(());
    }

    let seconds = cli
        .interval_secs
        .unwrap_or(config.bridge.poll_interval_secs)
        .max(1);
    poll(engine, Duration::from_secs(seconds)).await
}

fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let source = QRadarClient::new(config.source.clone())
        .context("Failed to build the QRadar HTTP client")?;
    let board = DeckClient::new(config.deck()).context("Failed to build the Deck HTTP client")?;
    let store = FileMappingStore::new(config.bridge.mapping_file.clone());
    let settings = config.engine_settings()?;

    Ok(Engine::new(
        Arc::new(source),
        Arc::new(board),
        Arc::new(store),
        settings,
    ))
}

/// Runs a cycle every `period` until a shutdown signal arrives.
///
/// An aborted cycle is logged and retried on the next tick; it never stops the
/// loop.
async fn poll(mut engine: Engine, period: Duration) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!(interval_secs = period.as_secs(), "Polling started");
    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal.context("Failed to listen for shutdown signals")?;
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {}
        }

        match engine.run_cycle().await {
            Ok(report) => log_report(&report),
            Err(e) => error!(
                error = %e,
                class = %e.class(),
                retry = ?e.retry_policy(),
                "Cycle aborted; retrying on the next interval"
            ),
        }
    }
    Ok(())
}

fn log_report(report: &CycleReport) {
    for failure in &report.best_effort_failures {
        warn!(
            cycle_id = %report.cycle_id,
            offense_id = %failure.offense,
            card_id = %failure.card,
            operation = failure.operation,
            error = %failure.message,
            "Best-effort step failed"
        );
    }
    if !report.is_clean() {
        warn!(
            cycle_id = %report.cycle_id,
            failed = report.failed(),
            best_effort_failures = report.best_effort_failures.len(),
            "Cycle finished with failures"
        );
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Installs the global subscriber. Returns the tracer provider when OTLP
/// export is enabled so it can be flushed on exit.
fn init_tracing(log_json: bool) -> anyhow::Result<Option<TracerProvider>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = if std::env::var_os("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .build()
            .context("Failed to build the OTLP span exporter")?;
        Some(
            TracerProvider::builder()
                .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                .build(),
        )
    } else {
        None
    };

    let fmt_layer = if log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("offense-deck")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .init();
    Ok(provider)
}
