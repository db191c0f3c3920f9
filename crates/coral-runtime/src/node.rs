//! Probe node - event handlers around the shared probe state
//!
//! The node is sans-IO: handlers update state, queue outgoing datagrams
//! and arm the deferred send. The async driver in `runtime` owns the
//! sockets and timers and feeds events in one at a time.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use coral_core::{
    CoralError, CoralResult, InstanceConfig, InstanceHandle, NodeColor, ProbePayload, Routing,
};
use coral_time::TickClock;

use crate::config::ProbeConfig;
use crate::console::{route_dump, ConsoleCommand, ConsoleSink};
use crate::event::ProbeEvent;
use crate::metrics::{MetricsReport, MetricsReporter};
use crate::scheduler::JitterScheduler;
use crate::state::{ProbeState, RttOutcome};

/// Link color advertised once at startup
pub const STARTUP_COLOR: NodeColor = NodeColor::White;

/// Counters kept alongside the probe state for diagnostics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeStats {
    pub events: u64,
    pub probes_sent: u64,
    pub send_failures: u64,
    pub datagrams_received: u64,
    pub rtt_accepted: u64,
    pub rtt_discarded: u64,
    pub repairs_requested: u64,
    pub repair_failures: u64,
    pub reports: u64,
}

/// A datagram queued for the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub dest: SocketAddr,
    pub payload: ProbePayload,
}

/// The probe node
pub struct ProbeNode<C, R> {
    config: ProbeConfig,
    peer: SocketAddr,
    clock: C,
    routing: R,
    /// Read once at startup
    instance: InstanceHandle,
    state: ProbeState,
    scheduler: JitterScheduler,
    metrics: MetricsReporter,
    sink: Box<dyn ConsoleSink + Send>,
    outgoing: VecDeque<Datagram>,
    /// Delay of a deferred send armed by the last periodic tick, not yet
    /// collected by the driver
    armed: Option<Duration>,
    deferred_pending: bool,
    stats: ProbeStats,
}

impl<C: TickClock, R: Routing> ProbeNode<C, R> {
    /// Read the routing instance and push the startup parameters.
    /// Fails without touching the routing layer if no instance exists.
    pub fn start(
        config: ProbeConfig,
        peer: SocketAddr,
        clock: C,
        mut routing: R,
        sink: Box<dyn ConsoleSink + Send>,
    ) -> CoralResult<Self> {
        let Some(instance) = routing.instance() else {
            error!("No routing instance available, refusing to start");
            return Err(CoralError::RoutingUnavailable);
        };

        let instance_config = InstanceConfig {
            color: STARTUP_COLOR,
            dio_doublings: config.dio_doublings,
        };
        routing.configure_instance(instance, instance_config)?;
        info!(
            instance = %instance,
            color = STARTUP_COLOR.name(),
            dio_doublings = config.dio_doublings,
            "routing instance configured"
        );

        let scheduler = JitterScheduler::new(config.send_interval, config.seed);

        Ok(ProbeNode {
            config,
            peer,
            clock,
            routing,
            instance,
            state: ProbeState::new(),
            scheduler,
            metrics: MetricsReporter::new(),
            sink,
            outgoing: VecDeque::new(),
            armed: None,
            deferred_pending: false,
            stats: ProbeStats::default(),
        })
    }

    /// Dispatch one event to its handler
    pub fn handle(&mut self, event: ProbeEvent) {
        self.stats.events += 1;
        debug!(event = event.name(), "handling event");

        match event {
            ProbeEvent::PeriodicTick => self.on_periodic_tick(),
            ProbeEvent::DeferredSend => {
                self.send_probe();
            }
            ProbeEvent::DatagramReceived { payload, from } => {
                self.on_datagram_received(&payload, from);
            }
            ProbeEvent::ExternalTrigger => self.on_external_trigger(),
            ProbeEvent::ConsoleCommand(line) => self.on_console_command(&line),
            ProbeEvent::MetricsTick => {
                self.on_metrics_tick();
            }
        }
    }

    /// Arm this period's send at a random offset in `[0, P)`
    pub fn on_periodic_tick(&mut self) {
        let delay = self.scheduler.next_delay();
        if self.deferred_pending {
            debug!("previous send still pending, rescheduling");
        }
        self.deferred_pending = true;
        self.armed = Some(delay);
        debug!(delay_ms = delay.as_millis() as u64, "probe send scheduled");
    }

    /// Stamp and queue one probe. Returns its sequence number.
    pub fn send_probe(&mut self) -> u32 {
        self.deferred_pending = false;

        if self.config.annotate && self.state.sequence() > 0 {
            self.annotate();
        }

        let now = self.clock.now();
        let seq = self.state.record_send(now);
        let payload = ProbePayload::encode(now, seq);

        info!(peer = %self.peer, seq, sent_at = %now, "Sent msg to peer");
        self.outgoing.push_back(Datagram {
            dest: self.peer,
            payload,
        });
        self.stats.probes_sent += 1;
        seq
    }

    fn annotate(&mut self) {
        let replies = self.state.replies_received();
        let seq = self.state.sequence();
        let color = if self.state.is_loss_free() { "GREEN" } else { "RED" };
        let line = format!(
            "#A r={}/{},color={},n={}",
            replies,
            seq,
            color,
            self.routing.route_count()
        );
        self.sink.line(&line);
    }

    /// Count a reply and update the RTT when nothing is outstanding
    pub fn on_datagram_received(&mut self, payload: &[u8], from: SocketAddr) -> RttOutcome {
        let outcome = self.state.record_reply(
            self.clock.now(),
            self.clock.modulus(),
            self.config.rtt_threshold(),
        );
        self.stats.datagrams_received += 1;

        match outcome {
            RttOutcome::Accepted(rtt) => {
                self.stats.rtt_accepted += 1;
                let wall = rtt.to_duration(self.clock.ticks_per_second());
                debug!(rtt = rtt.as_ticks(), rtt_us = wall.as_micros() as u64, "RTT sample");
            }
            RttOutcome::Implausible(elapsed) => {
                self.stats.rtt_discarded += 1;
                debug!(elapsed = elapsed.as_ticks(), "discarding implausible RTT sample");
            }
            RttOutcome::Outstanding => {}
        }

        info!(
            from = %from,
            seq = self.state.sequence(),
            replies = self.state.replies_received(),
            "DATA recvd '{}'",
            String::from_utf8_lossy(payload)
        );
        outcome
    }

    /// Forward the repair button to the routing layer
    pub fn on_external_trigger(&mut self) {
        info!(instance = %self.instance, "Initializing local repair");
        self.stats.repairs_requested += 1;
        if let Err(e) = self.routing.repair(self.instance) {
            self.stats.repair_failures += 1;
            warn!(instance = %self.instance, "repair request failed: {}", e);
        }
    }

    pub fn on_console_command(&mut self, line: &str) {
        match ConsoleCommand::parse(line) {
            Some(ConsoleCommand::Routes) => {
                for line in route_dump(&self.routing) {
                    self.sink.line(&line);
                }
            }
            Some(ConsoleCommand::Button) => self.on_external_trigger(),
            None => debug!(line = line.trim(), "ignoring console input"),
        }
    }

    /// Print this interval's report
    pub fn on_metrics_tick(&mut self) -> MetricsReport {
        let report = self.metrics.report(self.state.last_rtt());
        self.sink.line(&report.to_string());
        self.stats.reports += 1;
        report
    }

    /// Delay of a newly armed deferred send, if the last event armed one
    pub fn take_deferred(&mut self) -> Option<Duration> {
        self.armed.take()
    }

    /// Next datagram for the transport
    pub fn pop_outgoing(&mut self) -> Option<Datagram> {
        self.outgoing.pop_front()
    }

    /// The transport could not hand a probe to the network. The sequence
    /// number stays consumed.
    pub fn record_send_failure(&mut self, err: &CoralError) {
        self.stats.send_failures += 1;
        warn!(peer = %self.peer, seq = self.state.sequence(), "probe send failed: {}", err);
    }

    pub fn state(&self) -> &ProbeState {
        &self.state
    }

    pub fn stats(&self) -> &ProbeStats {
        &self.stats
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn instance(&self) -> InstanceHandle {
        self.instance
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn routing(&self) -> &R {
        &self.routing
    }

    pub fn metrics_round(&self) -> u32 {
        self.metrics.round()
    }

    /// True between a periodic tick and the send it armed
    pub fn deferred_pending(&self) -> bool {
        self.deferred_pending
    }
}
