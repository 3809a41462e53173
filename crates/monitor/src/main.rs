//! `compost-monitor` -- compost pile monitoring daemon.
//!
//! Polls the sensor hub for the latest reading of one device, runs the
//! diagnostic engine on every update and logs the resulting alerts and
//! care recommendations. Stops on Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable               | Required | Default                 | Description                      |
//! |------------------------|----------|-------------------------|----------------------------------|
//! | `SENSORHUB_URL`        | no       | `http://localhost:5000` | Sensor hub base URL              |
//! | `DEVICE_ID`            | no       | first listed device     | Device to monitor                |
//! | `POLL_INTERVAL_MS`     | no       | `2000`                  | Milliseconds between fetches     |
//! | `REQUEST_TIMEOUT_SECS` | no       | `5`                     | Per-request HTTP timeout         |
//! | `LOG_FORMAT`           | no       | `text`                  | `text` or `json` log lines       |

use std::sync::Arc;

use compost_monitor::config::{LogFormat, MonitorConfig};
use compost_monitor::error::MonitorError;
use compost_monitor::report::CycleReport;
use compost_monitor::resolve_device;
use compost_sensorhub::api::SensorHubApi;
use compost_sensorhub::poller::AcquisitionLoop;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = MonitorConfig::from_env();
    init_tracing(
        config
            .as_ref()
            .map(|c| c.log_format)
            .unwrap_or_default(),
    );

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Monitor failed to start");
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let json = format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compost_monitor=info,compost_sensorhub=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

async fn run(config: MonitorConfig) -> Result<(), MonitorError> {
    let api = SensorHubApi::new(&config.hub_url, config.request_timeout)?;
    let device_id = resolve_device(&api, config.device_id.as_deref()).await?;

    tracing::info!(
        hub_url = %config.hub_url,
        device_id = %device_id,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Starting compost monitor",
    );

    let acquisition = AcquisitionLoop::new(Arc::new(api));
    let reported = device_id.clone();
    acquisition.start(device_id, config.poll_interval, move |reading, status| {
        CycleReport::build(reported.as_str(), reading, status).log();
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutting down");
    acquisition.stop();
    Ok(())
}
