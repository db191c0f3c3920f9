//! CORAL Runtime - Probe node and event loop
//!
//! This crate implements the probe loop of a mesh node:
//! 1. Periodic tick arms a jittered send
//! 2. Deferred send stamps and queues a sequenced probe
//! 3. Inbound datagrams count as replies and gate RTT samples
//! 4. The repair button is forwarded to the routing layer
//! 5. An independent interval prints round and last RTT
//! 6. Console `r` dumps the route table

pub mod config;
pub mod console;
pub mod event;
pub mod metrics;
pub mod node;
pub mod routing;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod telemetry;

pub use config::*;
pub use console::*;
pub use event::*;
pub use metrics::*;
pub use node::*;
pub use routing::*;
pub use runtime::*;
pub use scheduler::*;
pub use state::*;
pub use telemetry::*;
