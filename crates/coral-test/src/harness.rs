//! Deterministic probe harness
//!
//! Drives one probe node against a simulated echo peer. Time is virtual:
//! the manual clock and both link directions advance together, and every
//! delivery is handed to the node as a datagram event in order.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use coral_core::{CoralResult, Tick};
use coral_runtime::{MemorySink, ProbeConfig, ProbeEvent, ProbeNode};
use coral_time::{ManualClock, TickClock};

use crate::link::{LinkConfig, LossyLink};
use crate::routing::RecordingRouting;

/// Node under test
pub type HarnessNode = ProbeNode<ManualClock, RecordingRouting>;

/// Harness configuration
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    pub probe: ProbeConfig,
    pub peer: SocketAddr,
    /// Node to peer
    pub uplink: LinkConfig,
    /// Peer to node
    pub downlink: LinkConfig,
    /// Counter value at virtual time zero
    pub start_tick: u64,
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            probe: ProbeConfig {
                seed: Some(7),
                ..ProbeConfig::default()
            },
            peer: SocketAddr::from((coral_transport::DEFAULT_PREFIX, 7000)),
            uplink: LinkConfig::perfect(Duration::from_millis(20)),
            downlink: LinkConfig::perfect(Duration::from_millis(20)),
            start_tick: 0,
            seed: 99,
        }
    }
}

/// Probe node wired to a simulated peer
pub struct ProbeHarness {
    node: HarnessNode,
    clock: ManualClock,
    routing: RecordingRouting,
    sink: MemorySink,
    uplink: LossyLink,
    downlink: LossyLink,
    /// Counter value at `epoch`
    origin: u64,
    epoch: Duration,
    elapsed: Duration,
    echoes: u64,
}

impl ProbeHarness {
    pub fn new(config: HarnessConfig, routing: RecordingRouting) -> CoralResult<Self> {
        let clock = ManualClock::default();
        clock.set(config.start_tick);
        let sink = MemorySink::new();

        let node = ProbeNode::start(
            config.probe,
            config.peer,
            clock.clone(),
            routing.clone(),
            Box::new(sink.clone()),
        )?;

        Ok(ProbeHarness {
            node,
            clock,
            routing,
            sink,
            uplink: LossyLink::new(config.uplink, config.seed),
            downlink: LossyLink::new(config.downlink, config.seed.wrapping_add(1)),
            origin: config.start_tick,
            epoch: Duration::ZERO,
            elapsed: Duration::ZERO,
            echoes: 0,
        })
    }

    /// Default configuration on a joined routing instance
    pub fn joined() -> CoralResult<Self> {
        Self::new(HarnessConfig::default(), RecordingRouting::joined(30))
    }

    /// Run one full send period: tick, jittered send, then the rest of
    /// the period with replies flowing back. Returns the probe's sequence.
    pub fn run_period(&mut self) -> u32 {
        let period = self.node.config().send_interval;

        self.node.handle(ProbeEvent::PeriodicTick);
        let delay = self.node.take_deferred().unwrap_or(Duration::ZERO);
        self.step(delay);

        let before = self.node.state().sequence();
        self.node.handle(ProbeEvent::DeferredSend);
        self.flush();
        self.step(period.saturating_sub(delay));

        debug_assert_eq!(self.node.state().sequence(), before.wrapping_add(1));
        self.node.state().sequence()
    }

    pub fn run_periods(&mut self, count: usize) {
        for _ in 0..count {
            self.run_period();
        }
    }

    /// Send a probe right now, bypassing the jitter
    pub fn send_now(&mut self) -> u32 {
        let seq = self.node.send_probe();
        self.flush();
        seq
    }

    /// Advance virtual time, delivering whatever lands on the way
    pub fn step(&mut self, dt: Duration) {
        let mut remaining = dt;
        loop {
            let next = [self.uplink.next_delivery(), self.downlink.next_delivery()]
                .into_iter()
                .flatten()
                .min();

            match next {
                Some(next) if next <= remaining => {
                    self.advance(next);
                    remaining -= next;
                }
                _ => {
                    self.advance(remaining);
                    return;
                }
            }
        }
    }

    fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.sync_clock();

        let arrived = self.uplink.tick(dt);
        // Bring the return path up to now before echoes enter it, so each
        // reply is stamped at the moment its probe reached the peer
        for reply in self.downlink.tick(dt) {
            self.deliver(reply);
        }
        for probe in arrived {
            self.echoes += 1;
            self.downlink.send(probe);
        }
    }

    fn deliver(&mut self, payload: Bytes) {
        let from = self.node.peer();
        self.node.handle(ProbeEvent::DatagramReceived { payload, from });
    }

    fn flush(&mut self) {
        while let Some(datagram) = self.node.pop_outgoing() {
            self.uplink
                .send(Bytes::copy_from_slice(datagram.payload.as_bytes()));
        }
    }

    fn sync_clock(&self) {
        let since = self.elapsed - self.epoch;
        let ticks = since.as_nanos() * u128::from(self.clock.ticks_per_second()) / 1_000_000_000;
        self.clock.set(self.origin + ticks as u64);
    }

    /// Jump the hardware counter to `raw`, as after a timer reset. Time
    /// keeps flowing from the new value.
    pub fn reset_counter(&mut self, raw: u64) {
        self.origin = raw;
        self.epoch = self.elapsed;
        self.sync_clock();
    }

    /// Drop the next `count` probes on the way to the peer
    pub fn lose_probes(&mut self, count: u32) {
        self.uplink.drop_next(count);
    }

    /// Drop the next `count` replies on the way back
    pub fn lose_replies(&mut self, count: u32) {
        self.downlink.drop_next(count);
    }

    pub fn press_button(&mut self) {
        self.node.handle(ProbeEvent::ExternalTrigger);
    }

    pub fn console(&mut self, line: &str) {
        self.node.handle(ProbeEvent::ConsoleCommand(line.to_string()));
    }

    pub fn metrics_tick(&mut self) {
        self.node.handle(ProbeEvent::MetricsTick);
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    pub fn node(&self) -> &HarnessNode {
        &self.node
    }

    pub fn routing(&self) -> &RecordingRouting {
        &self.routing
    }

    pub fn uplink(&self) -> &LossyLink {
        &self.uplink
    }

    pub fn downlink(&self) -> &LossyLink {
        &self.downlink
    }

    /// Console output so far, drained
    pub fn take_lines(&self) -> Vec<String> {
        self.sink.take()
    }

    pub fn echoes(&self) -> u64 {
        self.echoes
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_on_perfect_link() {
        let mut harness = ProbeHarness::joined().unwrap();
        assert_eq!(harness.run_period(), 1);
        harness.step(Duration::from_secs(1));

        let state = harness.node().state();
        assert_eq!(state.replies_received(), 1);
        // 40ms at 32768 ticks/s, give or take the truncation of either stamp
        let rtt = state.last_rtt().unwrap().as_ticks();
        assert!((1310..=1311).contains(&rtt), "rtt {}", rtt);
        assert_eq!(harness.echoes(), 1);
    }

    #[test]
    fn test_round_trip_spans_both_legs() {
        let config = HarnessConfig {
            uplink: LinkConfig::perfect(Duration::from_millis(20)),
            downlink: LinkConfig::perfect(Duration::from_millis(500)),
            ..HarnessConfig::default()
        };
        let mut harness = ProbeHarness::new(config, RecordingRouting::joined(30)).unwrap();
        harness.run_period();
        harness.step(Duration::from_secs(1));

        // 520ms at 32768 ticks/s is 17039.36
        let rtt = harness.node().state().last_rtt().unwrap().as_ticks();
        assert!((17039..=17040).contains(&rtt), "rtt {}", rtt);
    }

    #[test]
    fn test_zero_latency_echo_lands_in_same_step() {
        let config = HarnessConfig {
            uplink: LinkConfig::perfect(Duration::ZERO),
            downlink: LinkConfig::perfect(Duration::ZERO),
            ..HarnessConfig::default()
        };
        let mut harness = ProbeHarness::new(config, RecordingRouting::joined(30)).unwrap();
        harness.send_now();
        harness.step(Duration::from_millis(1));

        assert_eq!(harness.node().state().replies_received(), 1);
        assert_eq!(harness.node().state().last_rtt(), Some(coral_core::TickDuration(0)));
    }

    #[test]
    fn test_period_advances_virtual_time() {
        let mut harness = ProbeHarness::joined().unwrap();
        harness.run_periods(3);
        assert_eq!(harness.node().state().sequence(), 3);
        assert_eq!(harness.elapsed(), Duration::from_secs(180));
        assert_eq!(harness.now(), Tick(180 * 32_768));
    }
}
