//! Sequence gap accounting
//!
//! A memory-less gap counter: each observation compares the arriving
//! sequence number with the one expected next, adds the difference to a
//! running total and moves the expectation to `seq + 1`. Reordered and
//! duplicated packets produce negative deltas, so the total is a signed
//! telescoping sum rather than a count of packets that never arrived.

use crate::protocol::WrapPolicy;

#[derive(Debug, Clone)]
pub struct SequenceTracker {
    expected: u16,
    lost_packets: i64,
    policy: WrapPolicy,
}

impl SequenceTracker {
    pub fn new(policy: WrapPolicy) -> Self {
        Self {
            expected: 0,
            lost_packets: 0,
            policy,
        }
    }

    /// Account for an arriving sequence number and return the loss delta
    pub fn observe(&mut self, seq: u16) -> i64 {
        let delta = match self.policy {
            WrapPolicy::Signed => i64::from(seq) - i64::from(self.expected),
            WrapPolicy::Rollover => i64::from(seq.wrapping_sub(self.expected) as i16),
        };
        self.lost_packets += delta;
        self.expected = seq.wrapping_add(1);
        delta
    }

    pub fn expected(&self) -> u16 {
        self.expected
    }

    pub fn lost_packets(&self) -> i64 {
        self.lost_packets
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new(WrapPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn trace(tracker: &mut SequenceTracker, seqs: &[u16]) -> Vec<i64> {
        seqs.iter()
            .map(|&s| {
                tracker.observe(s);
                tracker.lost_packets()
            })
            .collect()
    }

    #[test]
    fn test_gap_scenario() {
        let mut tracker = SequenceTracker::default();
        assert_eq!(trace(&mut tracker, &[0, 1, 2, 5, 6]), vec![0, 0, 0, 2, 2]);
        assert_eq!(tracker.expected(), 7);
    }

    #[test]
    fn test_first_packet_counts_from_zero() {
        let mut tracker = SequenceTracker::default();
        assert_eq!(tracker.observe(10), 10);
        assert_eq!(tracker.lost_packets(), 10);
        assert_eq!(tracker.expected(), 11);
    }

    #[test]
    fn test_duplicate_and_reorder_go_negative() {
        let mut tracker = SequenceTracker::default();
        tracker.observe(0);
        tracker.observe(1);
        // duplicate of 1
        assert_eq!(tracker.observe(1), -1);
        assert_eq!(tracker.lost_packets(), -1);
        // late 0
        assert_eq!(tracker.observe(0), -2);
        assert_eq!(tracker.lost_packets(), -3);
        assert_eq!(tracker.expected(), 1);
    }

    #[test]
    fn test_signed_wrap_is_large_negative() {
        let mut tracker = SequenceTracker::new(WrapPolicy::Signed);
        tracker.observe(65535);
        assert_eq!(tracker.expected(), 0);
        tracker.observe(65534);
        // expectation wrapped to 65535
        assert_eq!(tracker.observe(0), -65535);
    }

    #[test]
    fn test_rollover_wrap_is_continuous() {
        let mut tracker = SequenceTracker::new(WrapPolicy::Rollover);
        tracker.observe(0);
        let before = tracker.lost_packets();
        for seq in [65533u16, 65534, 65535, 0, 1] {
            tracker.observe(seq);
        }
        // only the initial jump 1 -> 65533 is charged, as a negative step
        assert_eq!(tracker.lost_packets() - before, -4);
        assert_eq!(tracker.observe(2), 0);
        assert_eq!(tracker.observe(5), 2);
        assert_eq!(tracker.observe(4), -2);
    }

    proptest! {
        #[test]
        fn proptest_expected_follows_last(seqs in prop::collection::vec(any::<u16>(), 1..200)) {
            let mut tracker = SequenceTracker::default();
            for &s in &seqs {
                tracker.observe(s);
                prop_assert_eq!(tracker.expected(), s.wrapping_add(1));
            }
        }

        #[test]
        fn proptest_telescoping_sum_arbitrary(seqs in prop::collection::vec(0u16..u16::MAX, 1..200)) {
            // values below u16::MAX never wrap the expectation
            let mut tracker = SequenceTracker::default();
            for &s in &seqs {
                tracker.observe(s);
            }
            let n = seqs.len() as i64;
            let last = i64::from(*seqs.last().unwrap());
            // s_0 - 0 plus the sum of (s_i - s_{i-1} - 1)
            prop_assert_eq!(tracker.lost_packets(), last + 1 - n);
        }

        #[test]
        fn proptest_telescoping_sum_non_decreasing(
            start in 0u16..1000,
            steps in prop::collection::vec(0u16..5, 0..200),
        ) {
            let mut tracker = SequenceTracker::default();
            tracker.observe(start);
            let after_first = tracker.lost_packets();
            let mut seq = start;
            let mut prev_lost = after_first;
            for step in &steps {
                seq += step;
                tracker.observe(seq);
                // only repeats step backwards
                if *step > 0 {
                    prop_assert!(tracker.lost_packets() >= prev_lost);
                }
                prev_lost = tracker.lost_packets();
            }
            let n = steps.len() as i64 + 1;
            let s0 = i64::from(start);
            let sn = i64::from(seq);
            prop_assert_eq!(tracker.lost_packets() - after_first, sn + 1 - s0 - n);
        }
    }
}
