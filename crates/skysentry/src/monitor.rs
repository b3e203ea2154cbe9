//! Background signal monitor loop.
//!
//! Each tick the loop hops to a new channel, takes a spectrum sample,
//! classifies it, and records a timeline point. The first Interference
//! classification raises the one-shot alarm on the failsafe controller and
//! ends the loop; the loop also ends if something else tripped the failsafe
//! first. Periodic status events go to the log sink at a coarser interval
//! than the tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::failsafe::FailsafeController;
use crate::radio::{
    Classification, FrequencyHopper, InterferenceDetector, SpectrumSampler,
};
use crate::telemetry::{RadioStatus, SignalTimeline};

/// The interference watchdog task.
///
/// Generic over the sampler so a real RF front end (or a scripted test
/// source) can stand behind the same loop.
#[derive(Debug)]
pub struct SignalMonitorLoop<S: SpectrumSampler> {
    hopper: FrequencyHopper,
    sampler: S,
    detector: InterferenceDetector,
    failsafe: Arc<FailsafeController>,
    poll_interval: Duration,
    status_interval: Duration,
    timeline: SignalTimeline,
}

impl<S: SpectrumSampler> SignalMonitorLoop<S> {
    /// Assemble a monitor loop.
    #[must_use]
    pub fn new(
        hopper: FrequencyHopper,
        sampler: S,
        detector: InterferenceDetector,
        failsafe: Arc<FailsafeController>,
        poll_interval: Duration,
        status_interval: Duration,
        timeline_capacity: usize,
    ) -> Self {
        Self {
            hopper,
            sampler,
            detector,
            failsafe,
            poll_interval,
            status_interval,
            timeline: SignalTimeline::new(timeline_capacity),
        }
    }

    /// Run until interference trips the failsafe or the failsafe trips
    /// elsewhere. Returns the collected timeline for the reporting
    /// collaborator.
    pub async fn run(mut self) -> SignalTimeline {
        info!(
            channels = self.hopper.channels().len(),
            threshold = self.detector.threshold(),
            "signal monitor started"
        );
        let mut last_status = Instant::now();

        loop {
            if self.failsafe.is_tripped() {
                debug!("failsafe already tripped, monitor stopping");
                break;
            }

            let frequency_mhz = self.hopper.next_channel();
            let sample = self.sampler.sample(frequency_mhz);
            let peak_magnitude = sample.peak_magnitude();

            self.timeline.push(RadioStatus {
                timestamp: Utc::now(),
                frequency_mhz,
                rssi: sample.rssi,
                peak_magnitude,
            });

            match self.detector.classify(&sample) {
                Classification::Interference => {
                    warn!(
                        frequency_mhz,
                        peak_magnitude,
                        threshold = self.detector.threshold(),
                        "interference detected"
                    );
                    self.timeline.mark_alarm();
                    self.failsafe.trip();
                    break;
                }
                Classification::Clear => {
                    debug!(frequency_mhz, rssi = sample.rssi, peak_magnitude, "clear");
                }
            }

            if last_status.elapsed() >= self.status_interval {
                info!(
                    frequency_mhz,
                    rssi = sample.rssi,
                    peak_magnitude,
                    "radio status"
                );
                last_status = Instant::now();
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        info!(
            points = self.timeline.len(),
            alarm = ?self.timeline.alarm_index(),
            "signal monitor stopped"
        );
        self.timeline
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant as StdInstant;

    use super::*;
    use crate::failsafe::{HomeLocation, ReturnToHome};
    use crate::radio::{ChannelSet, SignalSample};
    use crate::store::{BackupKey, SecureBackupStore};

    /// Sampler replaying a fixed sequence of peak magnitudes, then repeating
    /// the last one.
    #[derive(Debug)]
    struct ScriptedSampler {
        peaks: Vec<f64>,
        next: usize,
    }

    impl ScriptedSampler {
        fn new(peaks: Vec<f64>) -> Self {
            Self { peaks, next: 0 }
        }
    }

    impl SpectrumSampler for ScriptedSampler {
        fn sample(&mut self, frequency_mhz: u32) -> SignalSample {
            let idx = self.next.min(self.peaks.len() - 1);
            self.next += 1;
            SignalSample {
                rssi: -60.0,
                spectrum: vec![0.0, self.peaks[idx], 0.0],
                frequency_mhz,
                captured_at: StdInstant::now(),
            }
        }

        fn spectrum_bins(&self) -> usize {
            3
        }
    }

    #[derive(Debug, Default)]
    struct CountingAutopilot {
        calls: Arc<AtomicUsize>,
    }

    impl ReturnToHome for CountingAutopilot {
        fn return_to_home(&self, _home: HomeLocation) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_setup(
        name: &str,
    ) -> (
        Arc<SecureBackupStore>,
        Arc<FailsafeController>,
        Arc<AtomicUsize>,
        std::path::PathBuf,
    ) {
        let dir =
            std::env::temp_dir().join(format!("skysentry_mon_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let key = BackupKey::random();
        let store = Arc::new(SecureBackupStore::open(&dir, &key).unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let actuator = CountingAutopilot {
            calls: Arc::clone(&calls),
        };
        let failsafe = Arc::new(FailsafeController::new(
            Arc::clone(&store),
            Box::new(actuator),
            HomeLocation { lat: 0.0, lon: 0.0 },
        ));
        (store, failsafe, calls, dir)
    }

    fn monitor_with_peaks(
        peaks: Vec<f64>,
        failsafe: Arc<FailsafeController>,
    ) -> SignalMonitorLoop<ScriptedSampler> {
        let channels = ChannelSet::new(2_400, 5, 4).unwrap();
        SignalMonitorLoop::new(
            FrequencyHopper::with_seed(channels, 11),
            ScriptedSampler::new(peaks),
            InterferenceDetector::new(50.0),
            failsafe,
            Duration::from_millis(5),
            Duration::from_secs(60),
            256,
        )
    }

    #[tokio::test]
    async fn test_alarm_on_third_sample() {
        let (store, failsafe, calls, dir) = test_setup("alarm");
        store.encrypt_and_store(b"cached", "snapshot").unwrap();

        let monitor = monitor_with_peaks(vec![10.0, 20.0, 60.0], Arc::clone(&failsafe));
        let timeline = monitor.run().await;

        // Two clear ticks, then the alarm tick
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.alarm_index(), Some(2));
        assert!(failsafe.is_tripped());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.count().unwrap(), 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_no_alarm_below_threshold() {
        let (_store, failsafe, calls, dir) = test_setup("quiet");

        let monitor = monitor_with_peaks(vec![10.0, 20.0, 30.0], Arc::clone(&failsafe));
        let run = tokio::spawn(monitor.run());

        // Give it a few ticks, then stop it externally
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!failsafe.is_tripped());
        failsafe.trip();

        let timeline = run.await.unwrap();
        assert!(timeline.alarm_index().is_none());
        assert!(timeline.len() >= 3);
        // The external trip invoked the actuator, not the monitor
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_monitor_exits_when_already_tripped() {
        let (_store, failsafe, _calls, dir) = test_setup("pretripped");
        failsafe.trip();

        let monitor = monitor_with_peaks(vec![10.0], Arc::clone(&failsafe));
        let timeline = monitor.run().await;
        assert!(timeline.is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_end_to_end_trip_stops_capture() {
        use crate::capture::{CaptureLoop, CaptureSource, SimulatedSensor};

        let (store, failsafe, calls, dir) = test_setup("endtoend");

        let sources: Vec<Box<dyn CaptureSource>> = vec![
            Box::new(SimulatedSensor::new("imu", 64)),
            Box::new(SimulatedSensor::new("gnss", 32)),
            Box::new(SimulatedSensor::new("camera", 128)),
        ];
        let capture = CaptureLoop::new(
            sources,
            Arc::clone(&store),
            Arc::clone(&failsafe),
            Duration::from_millis(10),
            Duration::from_millis(100),
        );

        // Third sample crosses the threshold
        let monitor = monitor_with_peaks(vec![10.0, 20.0, 60.0], Arc::clone(&failsafe));

        let capture_task = tokio::spawn(capture.run());
        let timeline = monitor.run().await;

        assert_eq!(timeline.alarm_index(), Some(2));
        assert!(failsafe.is_tripped());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Capture self-terminates within one tick period of the trip
        let stats = tokio::time::timeout(Duration::from_millis(100), capture_task)
            .await
            .expect("capture loop did not stop after trip")
            .unwrap();
        assert_eq!(stats.stored + stats.skipped, stats.ticks);

        // No record survives the erasure pass
        assert_eq!(store.count().unwrap(), 0);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_boundary_peak_does_not_trip() {
        let (_store, failsafe, _calls, dir) = test_setup("boundary");

        let monitor = monitor_with_peaks(vec![50.0, 50.0], Arc::clone(&failsafe));
        let run = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!failsafe.is_tripped());
        failsafe.trip();
        run.await.unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }
}
