//! Interarrival jitter accumulator
//!
//! Each arrival after the first adds `|t - t_prev| / 16` to a running total.
//! The 1/16 gain comes from the RTP interarrival estimator, but the value is
//! accumulated rather than smoothed, so it never decreases and reads as the
//! cumulative absolute interarrival spacing seen so far.

use std::time::Duration;

use crate::constants::JITTER_GAIN_DIVISOR;

#[derive(Debug, Clone, Default)]
pub struct JitterEstimator {
    prev_arrival: Option<Duration>,
    accumulator: f64,
}

impl JitterEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival (offset from stream start) and return the accumulator
    pub fn observe(&mut self, arrival: Duration) -> f64 {
        if let Some(prev) = self.prev_arrival {
            let delta = if arrival >= prev {
                arrival - prev
            } else {
                prev - arrival
            };
            self.accumulator += delta.as_secs_f64() / JITTER_GAIN_DIVISOR;
        }
        self.prev_arrival = Some(arrival);
        self.accumulator
    }

    pub fn jitter(&self) -> f64 {
        self.accumulator
    }

    pub fn prev_arrival(&self) -> Option<Duration> {
        self.prev_arrival
    }
}
