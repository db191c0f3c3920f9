//! Async driver for the probe node
//!
//! One task owns the node. It waits on every event source at once, takes
//! whichever fires first, runs the handler to completion, then flushes the
//! datagrams and deferred send the handler produced.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info};

use coral_core::{CoralResult, Routing};
use coral_time::TickClock;
use coral_transport::UdpTransport;

use crate::event::ProbeEvent;
use crate::node::ProbeNode;

/// Out-of-band inputs: the repair button and console lines
pub struct EventSources {
    pub triggers: mpsc::Receiver<()>,
    pub console: mpsc::Receiver<String>,
}

impl EventSources {
    /// Create sources together with the sending halves
    pub fn channel(buffer: usize) -> (EventSources, mpsc::Sender<()>, mpsc::Sender<String>) {
        let (trigger_tx, triggers) = mpsc::channel(buffer);
        let (console_tx, console) = mpsc::channel(buffer);
        (EventSources { triggers, console }, trigger_tx, console_tx)
    }
}

/// Binds a node to a UDP transport and the timers
pub struct ProbeRuntime<C, R> {
    node: ProbeNode<C, R>,
    transport: UdpTransport,
    packet_buffer: usize,
}

impl<C: TickClock, R: Routing> ProbeRuntime<C, R> {
    pub fn new(node: ProbeNode<C, R>, transport: UdpTransport, packet_buffer: usize) -> Self {
        ProbeRuntime {
            node,
            transport,
            packet_buffer: packet_buffer.max(1),
        }
    }

    pub fn node(&self) -> &ProbeNode<C, R> {
        &self.node
    }

    pub fn transport(&self) -> &UdpTransport {
        &self.transport
    }

    /// Run until `shutdown` resolves. Returns the node for inspection.
    pub async fn run<F>(
        mut self,
        mut sources: EventSources,
        shutdown: F,
    ) -> CoralResult<ProbeNode<C, R>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut packets = self.transport.spawn_receiver(self.packet_buffer);
        let mut periodic = periodic_timer(self.node.config().send_interval);
        let mut metrics = periodic_timer(self.node.config().metrics_interval);
        let mut deferred: Option<Pin<Box<Sleep>>> = None;

        info!(
            local = %self.transport.local_addr(),
            peer = %self.node.peer(),
            "probe loop started"
        );

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                _ = periodic.tick() => ProbeEvent::PeriodicTick,
                _ = deferred_fired(&mut deferred) => ProbeEvent::DeferredSend,
                Some((payload, from)) = packets.recv() => {
                    ProbeEvent::DatagramReceived { payload, from }
                }
                Some(()) = sources.triggers.recv() => ProbeEvent::ExternalTrigger,
                Some(line) = sources.console.recv() => ProbeEvent::ConsoleCommand(line),
                _ = metrics.tick() => ProbeEvent::MetricsTick,
            };

            if event == ProbeEvent::DeferredSend {
                deferred = None;
            }

            self.node.handle(event);

            if let Some(delay) = self.node.take_deferred() {
                deferred = Some(Box::pin(time::sleep(delay)));
            }
            self.flush().await;
        }

        if deferred.is_some() {
            debug!("dropping pending probe send on shutdown");
        }
        info!(stats = ?self.node.stats(), "probe loop stopped");
        Ok(self.node)
    }

    async fn flush(&mut self) {
        while let Some(datagram) = self.node.pop_outgoing() {
            if let Err(e) = self
                .transport
                .send_to(datagram.payload.as_bytes(), datagram.dest)
                .await
            {
                self.node.record_send_failure(&e);
            }
        }
    }
}

/// Self-resetting timer whose first tick is one full period away
fn periodic_timer(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn deferred_fired(slot: &mut Option<Pin<Box<Sleep>>>) {
    match slot {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}
