//! `skysentry` - drone-side jamming watchdog with one-shot failsafe
//!
//! This library monitors a (simulated) radio environment for hostile
//! interference while a capture pipeline persists encrypted sensor
//! snapshots to a backup store. The first confirmed interference detection
//! trips an irreversible failsafe: erase the backup store, then command
//! return-to-home.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod failsafe;
pub mod logging;
pub mod monitor;
pub mod radio;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};
pub use failsafe::{FailsafeController, FailsafeState, HomeLocation, ReturnToHome};
pub use logging::init_logging;
pub use monitor::SignalMonitorLoop;
pub use radio::{Classification, InterferenceDetector, SignalSample, SpectrumSampler};
pub use store::{BackupKey, RecordId, SecureBackupStore};
