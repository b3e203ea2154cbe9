//! Peak-over-threshold interference classification.

use super::SignalSample;

/// Outcome of classifying one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Nothing above the detection threshold.
    Clear,
    /// Peak spectrum magnitude exceeded the detection threshold.
    Interference,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clear => write!(f, "clear"),
            Self::Interference => write!(f, "interference"),
        }
    }
}

/// Stateless threshold classifier for spectrum samples.
///
/// A sample is Interference when its peak magnitude is strictly greater
/// than the threshold; a peak exactly at the threshold is Clear. No
/// hysteresis or smoothing: the same sample always classifies the same way.
#[derive(Debug, Clone, Copy)]
pub struct InterferenceDetector {
    threshold: f64,
}

impl InterferenceDetector {
    /// Create a detector with the given threshold. The threshold is constant
    /// for the process lifetime; validation happens at config load.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured detection threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one sample by its peak spectrum magnitude.
    #[must_use]
    pub fn classify(&self, sample: &SignalSample) -> Classification {
        if sample.peak_magnitude() > self.threshold {
            Classification::Interference
        } else {
            Classification::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn sample_with_peak(peak: f64) -> SignalSample {
        SignalSample {
            rssi: -60.0,
            spectrum: vec![0.5, peak, 0.25],
            frequency_mhz: 2_400,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_clear_below_threshold() {
        let detector = InterferenceDetector::new(50.0);
        assert_eq!(
            detector.classify(&sample_with_peak(49.9)),
            Classification::Clear
        );
    }

    #[test]
    fn test_interference_above_threshold() {
        let detector = InterferenceDetector::new(50.0);
        assert_eq!(
            detector.classify(&sample_with_peak(50.1)),
            Classification::Interference
        );
    }

    #[test]
    fn test_boundary_is_clear() {
        // Equality does not trip: the rule is strictly greater-than.
        let detector = InterferenceDetector::new(50.0);
        assert_eq!(
            detector.classify(&sample_with_peak(50.0)),
            Classification::Clear
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let detector = InterferenceDetector::new(10.0);
        let sample = sample_with_peak(12.0);
        for _ in 0..5 {
            assert_eq!(detector.classify(&sample), Classification::Interference);
        }
    }

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::Clear.to_string(), "clear");
        assert_eq!(Classification::Interference.to_string(), "interference");
    }
}
