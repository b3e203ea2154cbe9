//! `skysentryd` - drone-side jamming watchdog daemon
//!
//! Process entry: parse flags, load configuration, construct the
//! components, then run the signal monitor in the background and the
//! capture loop in the foreground until the failsafe trips. The post-run
//! summary goes to stdout as JSON for the reporting collaborator.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use skysentry::capture::{CaptureLoop, CaptureSource, SimulatedSensor};
use skysentry::cli::Cli;
use skysentry::monitor::SignalMonitorLoop;
use skysentry::radio::{FrequencyHopper, InterferenceDetector, SimulatedFrontEnd};
use skysentry::telemetry::RunSummary;
use skysentry::{
    init_logging, BackupKey, Config, FailsafeController, HomeLocation, ReturnToHome,
    SecureBackupStore,
};

/// Actuator stand-in: a real deployment wires the autopilot here.
#[derive(Debug)]
struct LoggingAutopilot;

impl ReturnToHome for LoggingAutopilot {
    fn return_to_home(&self, home: HomeLocation) {
        info!(lat = home.lat, lon = home.lon, "return-to-home engaged");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    // The backup key lives only in this process; once it is gone the
    // stored ciphertext is noise.
    let key = BackupKey::random();
    let store = Arc::new(
        SecureBackupStore::open(config.backup_dir(), &key).context("opening backup store")?,
    );

    let home = HomeLocation {
        lat: config.failsafe.home_lat,
        lon: config.failsafe.home_lon,
    };
    let failsafe = Arc::new(FailsafeController::new(
        Arc::clone(&store),
        Box::new(LoggingAutopilot),
        home,
    ));

    let monitor = SignalMonitorLoop::new(
        FrequencyHopper::new(config.channel_set().context("building channel plan")?),
        SimulatedFrontEnd::new(config.radio.spectrum_bins),
        InterferenceDetector::new(config.radio.detection_threshold),
        Arc::clone(&failsafe),
        config.poll_interval(),
        config.status_interval(),
        config.radio.timeline_capacity,
    );

    let sources: Vec<Box<dyn CaptureSource>> = vec![
        Box::new(SimulatedSensor::new("imu", 256)),
        Box::new(SimulatedSensor::new("gnss", 128)),
        Box::new(SimulatedSensor::new("camera", 4096)),
    ];
    let capture = CaptureLoop::new(
        sources,
        Arc::clone(&store),
        Arc::clone(&failsafe),
        config.capture_interval(),
        config.source_timeout(),
    );

    let monitor_task = tokio::spawn(monitor.run());
    let capture_stats = capture.run().await;
    let timeline = monitor_task.await.context("signal monitor task failed")?;

    let summary = RunSummary {
        timeline,
        capture: capture_stats,
        failsafe: failsafe.event(),
        store: store.stats().ok(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
