//! Link quality measurement
//!
//! Sequence gap counting, jitter accumulation and the CSV log they feed.

pub mod jitter;
pub mod log;
pub mod sequence;

pub use jitter::JitterEstimator;
pub use log::{read_log, MetricsLog, MetricsRow};
pub use sequence::SequenceTracker;

use std::time::{Duration, Instant};

use crate::protocol::WrapPolicy;

/// Per-stream receiver state, mutated once per valid packet
#[derive(Debug, Clone)]
pub struct StreamState {
    start: Instant,
    sequence: SequenceTracker,
    jitter: JitterEstimator,
}

impl StreamState {
    pub fn new(start: Instant, policy: WrapPolicy) -> Self {
        Self {
            start,
            sequence: SequenceTracker::new(policy),
            jitter: JitterEstimator::new(),
        }
    }

    /// Apply one packet and produce its log row
    pub fn observe(&mut self, seq: u16, arrival: Instant) -> MetricsRow {
        self.observe_offset(seq, arrival.saturating_duration_since(self.start))
    }

    /// Same as [`observe`](Self::observe) with the arrival given as an
    /// offset from stream start
    pub fn observe_offset(&mut self, seq: u16, elapsed: Duration) -> MetricsRow {
        self.sequence.observe(seq);
        let jitter = self.jitter.observe(elapsed);
        MetricsRow::new(elapsed.as_secs_f64(), jitter, self.sequence.lost_packets())
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn expected_seq(&self) -> u16 {
        self.sequence.expected()
    }

    pub fn lost_packets(&self) -> i64 {
        self.sequence.lost_packets()
    }

    pub fn jitter(&self) -> f64 {
        self.jitter.jitter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_state_scenario() {
        let mut state = StreamState::new(Instant::now(), WrapPolicy::Signed);
        let rows: Vec<MetricsRow> = [(0u16, 0.00), (1, 0.02), (2, 0.04), (5, 0.10), (6, 0.12)]
            .iter()
            .map(|&(seq, t)| state.observe_offset(seq, Duration::from_secs_f64(t)))
            .collect();

        let lost: Vec<i64> = rows.iter().map(|r| r.lost_packets).collect();
        assert_eq!(lost, vec![0, 0, 0, 2, 2]);
        assert_eq!(rows[0].jitter_ms, 0.0);
        assert!((rows[4].jitter_ms - 0.0075).abs() < 1e-9);
        assert!((rows[3].elapsed_seconds - 0.10).abs() < 1e-9);
        assert_eq!(state.expected_seq(), 7);
    }

    #[test]
    fn test_arrival_before_start_clamps() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut state = StreamState::new(start, WrapPolicy::Signed);
        let row = state.observe(0, Instant::now());
        assert_eq!(row.elapsed_seconds, 0.0);
    }
}
