//! Spectrum sampling front end.
//!
//! [`SpectrumSampler`] is the seam between the monitor loop and whatever
//! produces spectra: the shipped implementation synthesizes them, a real
//! deployment would put an ADC/FFT chain behind the same trait. The contract
//! any implementation must satisfy: bounded-step RSSI walk, fixed-length
//! spectrum, and a fast non-blocking return (the monitor polls at 10 Hz).

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use super::SignalSample;

/// Maximum RSSI change between consecutive samples, in dBm.
pub const RSSI_MAX_STEP_DBM: f64 = 5.0;

/// Source of per-tick radio environment samples.
pub trait SpectrumSampler: Send {
    /// Produce one analysis window on the given channel.
    fn sample(&mut self, frequency_mhz: u32) -> SignalSample;

    /// Number of bins in every spectrum this sampler produces.
    fn spectrum_bins(&self) -> usize;
}

/// Synthetic stand-in for an RF front end.
///
/// RSSI performs a random walk with uniform steps in
/// [-`RSSI_MAX_STEP_DBM`, +`RSSI_MAX_STEP_DBM`]; the spectrum is the
/// magnitude of white Gaussian noise, independent of the RSSI value.
#[derive(Debug)]
pub struct SimulatedFrontEnd {
    rssi: f64,
    bins: usize,
    noise: Normal<f64>,
    rng: StdRng,
}

impl SimulatedFrontEnd {
    /// Typical starting RSSI for a healthy link, in dBm.
    const INITIAL_RSSI_DBM: f64 = -60.0;

    /// Create a simulated front end producing spectra of `bins` bins.
    #[must_use]
    pub fn new(bins: usize) -> Self {
        Self::with_rng(bins, StdRng::from_entropy())
    }

    /// Create a simulated front end with a fixed seed, for deterministic
    /// tests.
    #[must_use]
    pub fn with_seed(bins: usize, seed: u64) -> Self {
        Self::with_rng(bins, StdRng::seed_from_u64(seed))
    }

    fn with_rng(bins: usize, rng: StdRng) -> Self {
        // Unit-variance noise; parameters are constant and always valid.
        let noise = Normal::new(0.0, 1.0).expect("unit normal is a valid distribution");
        Self {
            rssi: Self::INITIAL_RSSI_DBM,
            bins,
            noise,
            rng,
        }
    }

    /// The current RSSI value of the walk, in dBm.
    #[must_use]
    pub fn rssi(&self) -> f64 {
        self.rssi
    }
}

impl SpectrumSampler for SimulatedFrontEnd {
    fn sample(&mut self, frequency_mhz: u32) -> SignalSample {
        self.rssi += self.rng.gen_range(-RSSI_MAX_STEP_DBM..=RSSI_MAX_STEP_DBM);

        let spectrum = (0..self.bins)
            .map(|_| self.noise.sample(&mut self.rng).abs())
            .collect();

        SignalSample {
            rssi: self.rssi,
            spectrum,
            frequency_mhz,
            captured_at: Instant::now(),
        }
    }

    fn spectrum_bins(&self) -> usize {
        self.bins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rssi_walk_is_bounded() {
        let mut fe = SimulatedFrontEnd::with_seed(64, 3);
        let mut prev = fe.rssi();
        for _ in 0..500 {
            let sample = fe.sample(2_400);
            assert!((sample.rssi - prev).abs() <= RSSI_MAX_STEP_DBM);
            prev = sample.rssi;
        }
    }

    #[test]
    fn test_spectrum_length_is_fixed() {
        let mut fe = SimulatedFrontEnd::with_seed(1024, 3);
        assert_eq!(fe.spectrum_bins(), 1024);
        for _ in 0..10 {
            assert_eq!(fe.sample(2_405).spectrum.len(), 1024);
        }
    }

    #[test]
    fn test_spectrum_magnitudes_nonnegative() {
        let mut fe = SimulatedFrontEnd::with_seed(256, 9);
        let sample = fe.sample(2_410);
        assert!(sample.spectrum.iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn test_sample_carries_channel() {
        let mut fe = SimulatedFrontEnd::with_seed(8, 1);
        let sample = fe.sample(2_475);
        assert_eq!(sample.frequency_mhz, 2_475);
    }
}
