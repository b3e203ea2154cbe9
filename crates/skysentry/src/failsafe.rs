//! One-shot failsafe state machine.
//!
//! The controller owns the only safety-relevant transition in the system:
//! Armed to Tripped, exactly once, irreversibly. The compare-and-swap guard
//! means any number of tasks can race `trip()` and exactly one of them runs
//! the erase / report / return-to-home sequence; everyone else observes
//! Tripped and returns immediately.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::store::SecureBackupStore;
use crate::telemetry::FailsafeEvent;

const STATE_ARMED: u8 = 0;
const STATE_TRIPPED: u8 = 1;

/// Lifecycle of the failsafe: Armed at startup, Tripped forever after the
/// first alarm. There is no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailsafeState {
    /// Watching; no interference confirmed yet.
    Armed,
    /// The erase / report / RTH sequence has run (or is running).
    Tripped,
}

impl std::fmt::Display for FailsafeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Armed => write!(f, "armed"),
            Self::Tripped => write!(f, "tripped"),
        }
    }
}

/// Fixed return-to-home coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeLocation {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// Abstract autopilot actuator.
///
/// Out of scope to implement for real hardware; the contract is that
/// `return_to_home` is invoked at most once per process, and only after
/// erasure has been attempted.
pub trait ReturnToHome: Send + Sync {
    /// Command the vehicle to fly to `home`.
    fn return_to_home(&self, home: HomeLocation);
}

/// The one-shot failsafe controller.
///
/// Shared between the signal monitor (which trips it) and the capture loop
/// (which polls it to know when to stop). Cheap to poll from any task.
pub struct FailsafeController {
    state: AtomicU8,
    store: Arc<SecureBackupStore>,
    actuator: Box<dyn ReturnToHome>,
    home: HomeLocation,
    event: Mutex<Option<FailsafeEvent>>,
}

impl std::fmt::Debug for FailsafeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailsafeController")
            .field("state", &self.state())
            .field("home", &self.home)
            .finish_non_exhaustive()
    }
}

impl FailsafeController {
    /// Create an armed controller.
    #[must_use]
    pub fn new(
        store: Arc<SecureBackupStore>,
        actuator: Box<dyn ReturnToHome>,
        home: HomeLocation,
    ) -> Self {
        Self {
            state: AtomicU8::new(STATE_ARMED),
            store,
            actuator,
            home,
            event: Mutex::new(None),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> FailsafeState {
        if self.state.load(Ordering::Acquire) == STATE_ARMED {
            FailsafeState::Armed
        } else {
            FailsafeState::Tripped
        }
    }

    /// Whether the failsafe has tripped.
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_TRIPPED
    }

    /// The home coordinate the RTH actuator will receive.
    #[must_use]
    pub fn home(&self) -> HomeLocation {
        self.home
    }

    /// Trip the failsafe.
    ///
    /// Idempotent and safe under concurrent invocation: only the caller that
    /// wins the Armed-to-Tripped compare-and-swap executes the sequence
    /// (erase the backup store, emit the engaged event, command RTH) and
    /// gets `true` back. Every other caller returns `false` without side
    /// effects.
    ///
    /// An erasure failure is logged and reported in the event but does not
    /// stop the sequence: losing cached data is acceptable collateral,
    /// skipping the flight-safety action is not.
    pub fn trip(&self) -> bool {
        if self
            .state
            .compare_exchange(
                STATE_ARMED,
                STATE_TRIPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        warn!("failsafe tripped: erasing backup store");

        let (files_before, files_after, erase_error) = match self.store.erase_all() {
            Ok((before, after)) => (Some(before), Some(after), None),
            Err(e) => {
                error!("backup erasure failed, proceeding to return-to-home: {e}");
                (None, None, Some(e.to_string()))
            }
        };

        let event = FailsafeEvent {
            timestamp: Utc::now(),
            files_before,
            files_after,
            erase_error,
            home: self.home,
        };
        info!(
            files_before = ?event.files_before,
            files_after = ?event.files_after,
            home_lat = self.home.lat,
            home_lon = self.home.lon,
            "failsafe engaged"
        );
        *self.lock_event() = Some(event);

        self.actuator.return_to_home(self.home);
        true
    }

    /// The failsafe-engaged event, once tripped. Plain data for the
    /// reporting collaborator.
    #[must_use]
    pub fn event(&self) -> Option<FailsafeEvent> {
        self.lock_event().clone()
    }

    fn lock_event(&self) -> std::sync::MutexGuard<'_, Option<FailsafeEvent>> {
        self.event
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
