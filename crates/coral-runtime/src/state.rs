//! Probe state shared by the prober and the receipt tracker
//!
//! Loss detection is cumulative: an RTT sample is only taken when every
//! probe sent so far has been answered. A reply is never matched to the
//! probe that caused it.

use coral_core::{Tick, TickDuration, TickModulus};

/// Result of handling one inbound datagram
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RttOutcome {
    /// Counts matched and the sample passed the plausibility filter
    Accepted(TickDuration),
    /// Counts matched but the elapsed value is a wrap/reset artifact
    Implausible(TickDuration),
    /// Replies and sequence disagree; at least one probe is unanswered
    Outstanding,
}

/// Counters and timestamps of the probe loop
/// INVARIANT: `sequence` only changes in `record_send`,
/// `replies_received` only in `record_reply`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeState {
    sequence: u32,
    replies_received: u32,
    sent_timestamp: Tick,
    last_rtt: Option<TickDuration>,
}

impl ProbeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a new probe. Returns the sequence number it carries.
    pub fn record_send(&mut self, now: Tick) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sent_timestamp = now;
        self.sequence
    }

    /// Count a reply and take an RTT sample when no probe is outstanding
    pub fn record_reply(
        &mut self,
        now: Tick,
        modulus: TickModulus,
        threshold: TickDuration,
    ) -> RttOutcome {
        self.replies_received = self.replies_received.wrapping_add(1);

        if self.replies_received != self.sequence {
            return RttOutcome::Outstanding;
        }

        let elapsed = now.wrapping_since(self.sent_timestamp, modulus);
        if elapsed < threshold {
            self.last_rtt = Some(elapsed);
            RttOutcome::Accepted(elapsed)
        } else {
            RttOutcome::Implausible(elapsed)
        }
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn replies_received(&self) -> u32 {
        self.replies_received
    }

    pub fn sent_timestamp(&self) -> Tick {
        self.sent_timestamp
    }

    pub fn last_rtt(&self) -> Option<TickDuration> {
        self.last_rtt
    }

    /// True when every probe sent so far has been answered
    pub fn is_loss_free(&self) -> bool {
        self.replies_received == self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const THRESHOLD: TickDuration = TickDuration(100_000);

    #[test]
    fn test_first_probe_is_one() {
        let mut state = ProbeState::new();
        assert_eq!(state.sequence(), 0);
        assert_eq!(state.record_send(Tick(10)), 1);
        assert_eq!(state.sent_timestamp(), Tick(10));
    }

    #[test]
    fn test_matched_reply_sets_rtt() {
        let mut state = ProbeState::new();
        state.record_send(Tick(1000));
        let outcome = state.record_reply(Tick(1050), TickModulus::FULL, THRESHOLD);

        assert_eq!(outcome, RttOutcome::Accepted(TickDuration(50)));
        assert_eq!(state.last_rtt(), Some(TickDuration(50)));
        assert!(state.is_loss_free());
    }

    #[test]
    fn test_outstanding_probe_keeps_rtt() {
        let mut state = ProbeState::new();
        state.record_send(Tick(1000));
        state.record_reply(Tick(1050), TickModulus::FULL, THRESHOLD);

        // probe 2 lost, probe 3 answered: 2 replies vs 3 probes
        state.record_send(Tick(2000));
        state.record_send(Tick(3000));
        let outcome = state.record_reply(Tick(3020), TickModulus::FULL, THRESHOLD);

        assert_eq!(outcome, RttOutcome::Outstanding);
        assert_eq!(state.last_rtt(), Some(TickDuration(50)));
    }

    #[test]
    fn test_extra_reply_is_outstanding() {
        let mut state = ProbeState::new();
        state.record_send(Tick(0));
        state.record_reply(Tick(5), TickModulus::FULL, THRESHOLD);
        // Duplicate reply pushes replies past sequence
        let outcome = state.record_reply(Tick(6), TickModulus::FULL, THRESHOLD);
        assert_eq!(outcome, RttOutcome::Outstanding);
        assert_eq!(state.replies_received(), 2);
    }

    #[test]
    fn test_implausible_sample_discarded() {
        let mut state = ProbeState::new();
        state.record_send(Tick(1000));
        state.record_reply(Tick(1050), TickModulus::FULL, THRESHOLD);

        state.record_send(Tick(u32::MAX - 5));
        let outcome = state.record_reply(Tick(u32::MAX - 100), TickModulus::FULL, THRESHOLD);

        assert!(matches!(outcome, RttOutcome::Implausible(_)));
        assert_eq!(state.last_rtt(), Some(TickDuration(50)));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut state = ProbeState::new();
        state.record_send(Tick(0));
        let outcome = state.record_reply(Tick(100_000), TickModulus::FULL, THRESHOLD);
        assert_eq!(outcome, RttOutcome::Implausible(TickDuration(100_000)));
        assert_eq!(state.last_rtt(), None);
    }

    proptest! {
        #[test]
        fn prop_sequence_counts_sends(n in 1usize..500) {
            let mut state = ProbeState::new();
            for i in 0..n {
                state.record_send(Tick(i as u32));
            }
            prop_assert_eq!(state.sequence() as usize, n);
        }

        #[test]
        fn prop_rtt_changes_only_when_counts_match(
            ops in proptest::collection::vec(any::<bool>(), 1..200),
        ) {
            let mut state = ProbeState::new();
            let mut now = 0u32;
            for send in ops {
                now = now.wrapping_add(7);
                if send {
                    state.record_send(Tick(now));
                } else {
                    let before = state.last_rtt();
                    let outcome = state.record_reply(Tick(now), TickModulus::FULL, THRESHOLD);
                    if state.replies_received() == state.sequence() {
                        prop_assert!(!matches!(outcome, RttOutcome::Outstanding));
                    } else {
                        prop_assert_eq!(outcome, RttOutcome::Outstanding);
                        prop_assert_eq!(state.last_rtt(), before);
                    }
                }
            }
        }
    }
}
