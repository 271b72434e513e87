use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use logship_core::config::LogshipConfig;
use logship_daemon::cli::DaemonCli;
use logship_daemon::logging::init_tracing;
use logship_daemon::orchestrator::Orchestrator;
use logship_daemon::pipeline::Pipeline;

/// stdin is read on a blocking thread that only returns on the next line.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

const DEFAULT_CONFIG_PATH: &str = "logship.toml";

fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(cli));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run(cli: DaemonCli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => LogshipConfig::load(path).await?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            LogshipConfig::load(DEFAULT_CONFIG_PATH).await?
        }
        None => {
            let mut config = LogshipConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    // CLI 인자가 최우선
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if !cli.inputs.is_empty() {
        config.pipeline.inputs = cli.inputs;
    }
    config.validate()?;

    if cli.validate {
        Pipeline::from_config(&config)?;
        eprintln!("configuration is valid");
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "logship-daemon starting");

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    let stats = orchestrator.run().await?;

    tracing::info!(
        read = stats.read,
        written = stats.written,
        "logship-daemon shut down"
    );
    Ok(())
}
