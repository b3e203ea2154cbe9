//! Frequency-hopping channel plan and hop selection.
//!
//! The hop set is a fixed, strictly increasing sequence of channel center
//! frequencies with constant spacing. The hopper advances through it
//! uniformly at random, which is enough to make a narrowband jammer chase
//! the link rather than park on it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// An ordered, fixed-step set of allowed channel frequencies in MHz.
///
/// Immutable after construction. The constructor enforces the invariants:
/// non-empty, strictly increasing, constant spacing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSet {
    frequencies: Vec<u32>,
}

impl ChannelSet {
    /// Build a channel set of `count` channels starting at `base_mhz` with
    /// `step_mhz` spacing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `count` or `step_mhz` is zero, or if
    /// the plan would overflow `u32` frequencies.
    pub fn new(base_mhz: u32, step_mhz: u32, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(Error::config_validation("channel set must not be empty"));
        }
        if step_mhz == 0 {
            return Err(Error::config_validation("channel step must be non-zero"));
        }

        let top = u64::from(base_mhz) + u64::from(step_mhz) * u64::from(count - 1);
        if top > u64::from(u32::MAX) {
            return Err(Error::config_validation(format!(
                "channel plan exceeds representable frequencies: top channel {top} MHz"
            )));
        }

        let frequencies = (0..count).map(|i| base_mhz + step_mhz * i).collect();
        Ok(Self { frequencies })
    }

    /// All channel frequencies, in increasing order.
    #[must_use]
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Number of channels in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    /// A channel set is never empty; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Check whether a frequency belongs to the set.
    #[must_use]
    pub fn contains(&self, frequency_mhz: u32) -> bool {
        self.frequencies.binary_search(&frequency_mhz).is_ok()
    }
}

/// Uniform pseudo-random frequency hopper over a [`ChannelSet`].
///
/// `next_channel()` picks a channel uniformly at random and makes it the
/// current one; `current()` reports the last selection (the first channel of
/// the set before any hop). Pure in-memory state, no failure modes.
#[derive(Debug)]
pub struct FrequencyHopper {
    channels: ChannelSet,
    current: u32,
    rng: StdRng,
}

impl FrequencyHopper {
    /// Create a hopper over the given channel set.
    #[must_use]
    pub fn new(channels: ChannelSet) -> Self {
        let current = channels.frequencies()[0];
        Self {
            channels,
            current,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a hopper with a fixed seed, for deterministic tests.
    #[must_use]
    pub fn with_seed(channels: ChannelSet, seed: u64) -> Self {
        let current = channels.frequencies()[0];
        Self {
            channels,
            current,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The last selected channel in MHz.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    /// The channel plan this hopper draws from.
    #[must_use]
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Select a new current channel uniformly at random and return it.
    pub fn next_channel(&mut self) -> u32 {
        let idx = self.rng.gen_range(0..self.channels.len());
        self.current = self.channels.frequencies()[idx];
        self.current
    }
}
