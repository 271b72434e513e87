//! Daemon orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] loads configuration, installs the metrics
//! recorder, builds the [`Pipeline`] and runs it until the inputs are
//! exhausted or a termination signal arrives.
//!
//! # Shutdown
//!
//! 1. SIGTERM/SIGINT is broadcast to every background task
//! 2. Input readers stop reading
//! 3. Workers drain their queues and the writer flushes stdout

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::broadcast;

use logship_core::config::LogshipConfig;

use crate::metrics_server;
use crate::pipeline::{Pipeline, PipelineStats};

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogshipConfig,
    /// Pipeline, taken by [`Orchestrator::run`].
    pipeline: Option<Pipeline>,
    /// Shutdown broadcast sender (signals all background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from `config_path` and build the orchestrator.
    pub async fn build(config_path: &Path) -> Result<Self> {
        tracing::info!(path = %config_path.display(), "loading configuration");
        let config = LogshipConfig::load(config_path).await?;
        Self::build_from_config(config).await
    }

    /// Build the orchestrator from an already loaded configuration.
    ///
    /// Installs the metrics recorder when `[metrics]` is enabled and
    /// compiles every condition tree.
    pub async fn build_from_config(config: LogshipConfig) -> Result<Self> {
        config.validate()?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let pipeline = Pipeline::from_config(&config)?;
        record_daemon_metrics();

        let (shutdown_tx, _) = broadcast::channel(16);

        tracing::info!(
            inputs = config.pipeline.inputs.len(),
            actions = config.pipeline.actions.len(),
            exceptions = config.antispam.exceptions.len(),
            "orchestrator built"
        );

        Ok(Self {
            config,
            pipeline: Some(pipeline),
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Run the pipeline until the inputs end or a shutdown signal arrives.
    pub async fn run(&mut self) -> Result<PipelineStats> {
        let pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| anyhow::anyhow!("orchestrator has already run"))?;

        let uptime_updater = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe()));

        let run = pipeline.run(tokio::io::stdout(), self.shutdown_tx.subscribe());
        tokio::pin!(run);

        let stats = tokio::select! {
            stats = &mut run => stats?,
            signal = wait_for_shutdown_signal() => {
                let signal = signal?;
                tracing::info!(signal, "shutdown signal received");
                let _ = self.shutdown_tx.send(());
                run.await?
            }
        };

        // stop the uptime updater when the inputs ran out on their own
        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_updater {
            let _ = task.await;
        }

        Ok(stats)
    }

    /// Trigger a shutdown from another task.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogshipConfig {
        &self.config
    }
}

/// Wait for SIGTERM or SIGINT.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

fn record_daemon_metrics() {
    use logship_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    use logship_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
