use anyhow::Context;
use clap::Parser;
use drone_analytics::{
    actors::{
        ingestion::{GatewayHandle, QUEUE_CAPACITY},
        pipeline::PipelineHandle,
    },
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, read_config_file},
    metrics::MetricsSink,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Optional JSON config file; environment variables override it
    #[arg(short)]
    file: Option<String>,

    /// Log every evaluation
    #[arg(long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("drone_analytics", level),
        ("hub", level),
        ("tower_http", LevelFilter::INFO),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let config = match &args.file {
        Some(path) => read_config_file(path)?.with_overrides(|name| std::env::var(name).ok()),
        None => Config::from_env(),
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;
    debug!("using config: {config:?}");

    let metrics = MetricsSink::new()?;

    let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
    let gateway = GatewayHandle::spawn(&config.mqtt, queue_tx);
    let (pipeline, mut task) = PipelineHandle::spawn(
        config.analytics.clone(),
        queue_rx,
        metrics.clone(),
        Some(gateway.clone()),
    );

    let state = ApiState::new(metrics)
        .with_pipeline(pipeline.clone())
        .with_gateway(gateway);
    spawn_api_server(ApiConfig::on_port(config.prometheus_port), state).await?;

    info!(
        "analytics hub running against {}:{} on {}/#",
        config.mqtt.host, config.mqtt.port, config.mqtt.base_topic
    );

    tokio::select! {
        result = &mut task => {
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!("pipeline stopped: {e:#}");
                    Err(e)
                }
                Err(e) => Err(e).context("pipeline task panicked"),
            };
        }

        signal = shutdown_signal() => {
            if let Err(e) = signal {
                warn!("failed to listen for shutdown signal: {e:#}");
            }
            info!("shutting down");
        }
    }

    pipeline.shutdown().await?;
    task.await.context("pipeline task panicked")??;

    info!("analytics hub stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    Ok(())
}
