//! Plain-data telemetry for the log sink and reporting collaborators.
//!
//! The core emits structured events and keeps bounded time series; rendering
//! plots, confusion matrices, or dashboards happens elsewhere. Everything
//! here is serde-serializable so the log sink can ship it as JSON.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::failsafe::HomeLocation;
use crate::store::StoreStats;

/// One periodic radio status point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioStatus {
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
    /// Channel the sample was taken on, in MHz.
    pub frequency_mhz: u32,
    /// Received signal strength in dBm.
    pub rssi: f64,
    /// Maximum magnitude across the spectrum vector.
    pub peak_magnitude: f64,
}

/// Bounded history of radio status points plus the alarm position.
///
/// The ring keeps the most recent points up to its capacity so an alarm-free
/// run cannot grow without bound; `dropped` counts points that aged out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTimeline {
    points: VecDeque<RadioStatus>,
    capacity: usize,
    alarm_index: Option<usize>,
    dropped: u64,
}

impl SignalTimeline {
    /// Create a timeline retaining at most `capacity` points.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            alarm_index: None,
            dropped: 0,
        }
    }

    /// Append a status point, evicting the oldest once at capacity.
    pub fn push(&mut self, status: RadioStatus) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
            self.dropped += 1;
            if let Some(idx) = self.alarm_index {
                self.alarm_index = idx.checked_sub(1);
            }
        }
        self.points.push_back(status);
    }

    /// Mark the most recently pushed point as the alarm.
    pub fn mark_alarm(&mut self) {
        if !self.points.is_empty() {
            self.alarm_index = Some(self.points.len() - 1);
        }
    }

    /// The retained status points, oldest first.
    #[must_use]
    pub fn points(&self) -> impl Iterator<Item = &RadioStatus> {
        self.points.iter()
    }

    /// Number of retained points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the timeline holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the alarm point within the retained history, if one fired.
    #[must_use]
    pub fn alarm_index(&self) -> Option<usize> {
        self.alarm_index
    }

    /// Number of points evicted by the capacity bound.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// The one-shot failsafe-engaged event.
///
/// Erase counts are `None` when the erasure pass itself failed; the RTH
/// trigger runs either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailsafeEvent {
    /// When the failsafe tripped.
    pub timestamp: DateTime<Utc>,
    /// Records in the store before erasure.
    pub files_before: Option<usize>,
    /// Records remaining after erasure.
    pub files_after: Option<usize>,
    /// Description of an erasure failure, if one occurred.
    pub erase_error: Option<String>,
    /// Destination of the return-to-home maneuver.
    pub home: HomeLocation,
}

/// Counters from the capture loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    /// Ticks attempted.
    pub ticks: u64,
    /// Records stored successfully.
    pub stored: u64,
    /// Ticks skipped due to source or storage failures.
    pub skipped: u64,
}

/// Post-run data handed to the reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Radio status history and alarm position.
    pub timeline: SignalTimeline,
    /// Capture loop counters.
    pub capture: CaptureStats,
    /// The failsafe event, if the watchdog tripped.
    pub failsafe: Option<FailsafeEvent>,
    /// Final backup store contents, if enumerable.
    pub store: Option<StoreStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(freq: u32) -> RadioStatus {
        RadioStatus {
            timestamp: Utc::now(),
            frequency_mhz: freq,
            rssi: -60.0,
            peak_magnitude: 1.0,
        }
    }

    #[test]
    fn test_timeline_push_and_len() {
        let mut timeline = SignalTimeline::new(10);
        assert!(timeline.is_empty());

        timeline.push(status(2_400));
        timeline.push(status(2_405));
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.dropped(), 0);
    }

    #[test]
    fn test_timeline_evicts_at_capacity() {
        let mut timeline = SignalTimeline::new(3);
        for freq in [1, 2, 3, 4, 5] {
            timeline.push(status(freq));
        }

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.dropped(), 2);
        let freqs: Vec<u32> = timeline.points().map(|p| p.frequency_mhz).collect();
        assert_eq!(freqs, vec![3, 4, 5]);
    }

    #[test]
    fn test_alarm_index_tracks_eviction() {
        let mut timeline = SignalTimeline::new(3);
        timeline.push(status(1));
        timeline.push(status(2));
        timeline.mark_alarm();
        assert_eq!(timeline.alarm_index(), Some(1));

        // One eviction shifts the alarm left
        timeline.push(status(3));
        timeline.push(status(4));
        assert_eq!(timeline.alarm_index(), Some(0));

        // Evicting the alarm point itself clears the marker
        timeline.push(status(5));
        assert_eq!(timeline.alarm_index(), None);
    }

    #[test]
    fn test_mark_alarm_on_empty_is_noop() {
        let mut timeline = SignalTimeline::new(3);
        timeline.mark_alarm();
        assert_eq!(timeline.alarm_index(), None);
    }

    #[test]
    fn test_capture_stats_default() {
        let stats = CaptureStats::default();
        assert_eq!(stats.ticks, 0);
        assert_eq!(stats.stored, 0);
        assert_eq!(stats.skipped, 0);
    }

    #[test]
    fn test_timeline_serializes() {
        let mut timeline = SignalTimeline::new(4);
        timeline.push(status(2_400));
        timeline.mark_alarm();

        let json = serde_json::to_string(&timeline).unwrap();
        assert!(json.contains("alarm_index"));
        assert!(json.contains("2400"));
    }

    #[test]
    fn test_failsafe_event_serializes() {
        let event = FailsafeEvent {
            timestamp: Utc::now(),
            files_before: Some(5),
            files_after: Some(0),
            erase_error: None,
            home: HomeLocation {
                lat: 59.33,
                lon: 18.06,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("files_before"));
        assert!(json.contains("59.33"));
    }
}
