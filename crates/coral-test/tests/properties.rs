//! Property tests over whole harness runs

use std::time::Duration;

use proptest::prelude::*;

use coral_runtime::ProbeConfig;
use coral_test::{HarnessConfig, LinkConfig, ProbeHarness, RecordingRouting};

fn harness(seed: u64, loss: f64) -> ProbeHarness {
    let config = HarnessConfig {
        probe: ProbeConfig {
            seed: Some(seed),
            ..ProbeConfig::default()
        },
        uplink: LinkConfig::lossy(loss),
        downlink: LinkConfig::lossy(loss),
        seed,
        ..HarnessConfig::default()
    };
    ProbeHarness::new(config, RecordingRouting::joined(30)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_sequence_equals_sends(seed in any::<u64>(), n in 1usize..40) {
        let mut h = harness(seed, 0.1);
        h.run_periods(n);
        prop_assert_eq!(h.node().state().sequence() as usize, n);
    }

    #[test]
    fn prop_replies_never_exceed_sends(seed in any::<u64>(), loss in 0.0f64..0.5, n in 1usize..30) {
        let mut h = harness(seed, loss);
        h.run_periods(n);
        h.step(Duration::from_secs(1));
        let state = h.node().state();
        prop_assert!(state.replies_received() <= state.sequence());
    }

    #[test]
    fn prop_rtt_only_sampled_while_loss_free(seed in any::<u64>(), n in 1usize..30) {
        let mut h = harness(seed, 0.3);
        let mut first_gap = None;
        for round in 0..n {
            h.run_period();
            h.step(Duration::from_secs(1));
            let state = h.node().state();
            if first_gap.is_none() && !state.is_loss_free() {
                first_gap = Some((round, h.node().stats().rtt_accepted));
            }
        }
        if let Some((_, accepted)) = first_gap {
            prop_assert_eq!(h.node().stats().rtt_accepted, accepted);
        }
    }
}
