use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use drone_analytics::{
    actors::ingestion::Topics, config::Config, simulator::EdgeSimulator, util::now_secs,
};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, QoS};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Milliseconds between samples
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many samples
    #[arg(long)]
    count: Option<u64>,

    /// Seed for the altitude noise
    #[arg(long)]
    seed: Option<u64>,

    /// MQTT client id
    #[arg(long, default_value = "edge-sim")]
    client_id: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("drone_analytics", LevelFilter::DEBUG),
        ("edge_sim", LevelFilter::TRACE),
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = Config::from_env();
    let topics = Topics::new(&config.mqtt.base_topic);

    let mut options = MqttOptions::new(&args.client_id, &config.mqtt.host, config.mqtt.port);
    options.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(options, 10);

    let connection = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(event) => trace!("mqtt event: {event:?}"),
                Err(e) => {
                    warn!("broker connection error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    let mut simulator = match args.seed {
        Some(seed) => EdgeSimulator::seeded(seed),
        None => EdgeSimulator::new(),
    };

    info!(
        "publishing to {} every {}ms",
        topics.telemetry, args.interval_ms
    );

    let mut ticker = interval(Duration::from_millis(args.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }

        let sample = simulator.next_sample(now_secs());
        let payload = serde_json::to_vec(&sample.telemetry_payload())?;
        client
            .publish(&topics.telemetry, QoS::AtMostOnce, false, payload)
            .await
            .context("failed to publish telemetry")?;

        if let Some(event) = sample.event_payload() {
            debug!("battery low at seq {}", simulator.seq());
            let payload = serde_json::to_vec(&event)?;
            client
                .publish(&topics.event, QoS::AtLeastOnce, false, payload)
                .await
                .context("failed to publish event")?;
        }

        if args.count.is_some_and(|count| simulator.seq() as u64 >= count) {
            break;
        }
    }

    client.disconnect().await?;
    if tokio::time::timeout(Duration::from_secs(2), connection)
        .await
        .is_err()
    {
        warn!("timed out waiting for disconnect");
    }

    info!("published {} samples", simulator.seq());
    Ok(())
}
