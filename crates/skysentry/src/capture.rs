//! Foreground capture pipeline.
//!
//! Each tick the loop pulls a snapshot from every capture source, frames
//! them into one payload with the capture timestamp, and hands the result to
//! the encrypted backup store. The loop checks the failsafe before every
//! tick and stops within one tick period of it tripping; a sealed store
//! (the failsafe won a race mid-tick) also stops the loop. Everything else
//! that can go wrong in a tick is logged and skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::failsafe::FailsafeController;
use crate::store::{RecordId, SecureBackupStore};
use crate::telemetry::CaptureStats;

/// Label prefix for records written by the capture loop.
const SNAPSHOT_LABEL: &str = "snapshot";

/// A sensor snapshot producer.
///
/// Implementors are hardware-specific external collaborators; the loop only
/// requires that `acquire` yields an opaque byte buffer and returns within
/// the configured per-source timeout (the loop enforces the timeout
/// regardless).
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// The name of this capture source (for logging and payload framing).
    fn name(&self) -> &'static str;

    /// Produce one snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying sensor cannot produce data; the
    /// capture loop logs it and skips the tick.
    async fn acquire(&mut self) -> Result<Vec<u8>>;
}

/// Simulated sensor emitting random bytes of a fixed size.
///
/// Stand-in for real hardware collaborators (IMU, GNSS, camera).
#[derive(Debug)]
pub struct SimulatedSensor {
    name: &'static str,
    snapshot_len: usize,
    rng: StdRng,
}

impl SimulatedSensor {
    /// Create a simulated sensor producing `snapshot_len`-byte snapshots.
    #[must_use]
    pub fn new(name: &'static str, snapshot_len: usize) -> Self {
        Self {
            name,
            snapshot_len,
            rng: StdRng::from_entropy(),
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for SimulatedSensor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn acquire(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.snapshot_len];
        self.rng.fill(buf.as_mut_slice());
        Ok(buf)
    }
}

/// Frame source snapshots into one payload.
///
/// Layout: 8-byte big-endian capture timestamp in microseconds, then per
/// source a 2-byte name length, the name bytes, a 4-byte payload length,
/// and the payload bytes.
fn frame_payload(timestamp_micros: i64, parts: &[(&'static str, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(
        8 + parts
            .iter()
            .map(|(name, bytes)| 6 + name.len() + bytes.len())
            .sum::<usize>(),
    );
    payload.extend_from_slice(&timestamp_micros.to_be_bytes());

    for (name, bytes) in parts {
        let name_len = u16::try_from(name.len())
            .map_err(|_| Error::internal(format!("source name too long: {name}")))?;
        let data_len = u32::try_from(bytes.len())
            .map_err(|_| Error::internal(format!("snapshot from '{name}' too large")))?;
        payload.extend_from_slice(&name_len.to_be_bytes());
        payload.extend_from_slice(name.as_bytes());
        payload.extend_from_slice(&data_len.to_be_bytes());
        payload.extend_from_slice(bytes);
    }

    Ok(payload)
}

/// The foreground capture task.
pub struct CaptureLoop {
    sources: Vec<Box<dyn CaptureSource>>,
    store: Arc<SecureBackupStore>,
    failsafe: Arc<FailsafeController>,
    interval: Duration,
    source_timeout: Duration,
}

impl std::fmt::Debug for CaptureLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("CaptureLoop")
            .field("sources", &names)
            .field("interval", &self.interval)
            .field("source_timeout", &self.source_timeout)
            .finish_non_exhaustive()
    }
}

impl CaptureLoop {
    /// Assemble a capture loop over the given sources.
    #[must_use]
    pub fn new(
        sources: Vec<Box<dyn CaptureSource>>,
        store: Arc<SecureBackupStore>,
        failsafe: Arc<FailsafeController>,
        interval: Duration,
        source_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            store,
            failsafe,
            interval,
            source_timeout,
        }
    }

    /// Run until the failsafe trips. Returns the tick counters for the
    /// reporting collaborator.
    pub async fn run(mut self) -> CaptureStats {
        info!(sources = self.sources.len(), "capture loop started");
        let mut stats = CaptureStats::default();

        loop {
            if self.failsafe.is_tripped() {
                break;
            }

            stats.ticks += 1;
            match self.tick().await {
                Ok(id) => {
                    stats.stored += 1;
                    debug!("capture tick stored record {}", id);
                }
                Err(e) if e.is_sealed() => {
                    // The failsafe erased the store mid-tick; nothing more
                    // to persist.
                    stats.skipped += 1;
                    break;
                }
                Err(e) => {
                    stats.skipped += 1;
                    warn!("capture tick skipped: {e}");
                }
            }

            tokio::time::sleep(self.interval).await;
        }

        info!(
            ticks = stats.ticks,
            stored = stats.stored,
            skipped = stats.skipped,
            "capture loop stopped"
        );
        stats
    }

    /// Acquire from every source, frame, encrypt, persist.
    async fn tick(&mut self) -> Result<RecordId> {
        let timestamp_micros = Utc::now().timestamp_micros();
        let mut parts = Vec::with_capacity(self.sources.len());

        for source in &mut self.sources {
            let name = source.name();
            match timeout(self.source_timeout, source.acquire()).await {
                Ok(Ok(bytes)) => parts.push((name, bytes)),
                Ok(Err(e)) => return Err(Error::capture_source(name, e.to_string())),
                Err(_) => return Err(Error::CaptureTimeout { name }),
            }
        }

        let payload = frame_payload(timestamp_micros, &parts)?;
        self.store.encrypt_and_store(&payload, SNAPSHOT_LABEL)
    }
}
