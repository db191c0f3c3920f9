//! Events consumed by the node loop

use std::net::SocketAddr;

use bytes::Bytes;

/// Everything that can wake the node. Each event is handled to completion
/// before the next one is taken.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeEvent {
    /// The send period elapsed
    PeriodicTick,
    /// The jittered send of the current period is due
    DeferredSend,
    /// A datagram arrived on the probe socket
    DatagramReceived { payload: Bytes, from: SocketAddr },
    /// The repair button was pressed
    ExternalTrigger,
    /// One line of console input
    ConsoleCommand(String),
    /// The metrics interval elapsed
    MetricsTick,
}

impl ProbeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProbeEvent::PeriodicTick => "periodic_tick",
            ProbeEvent::DeferredSend => "deferred_send",
            ProbeEvent::DatagramReceived { .. } => "datagram_received",
            ProbeEvent::ExternalTrigger => "external_trigger",
            ProbeEvent::ConsoleCommand(_) => "console_command",
            ProbeEvent::MetricsTick => "metrics_tick",
        }
    }
}
