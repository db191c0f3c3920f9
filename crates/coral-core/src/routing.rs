//! Routing collaborator interface
//!
//! The probe never builds or repairs the DAG itself. It reads an instance
//! handle once, tunes two parameters, and forwards repair requests.

use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;

use crate::CoralResult;

/// Interval doublings applied to the DIO trickle timer at startup
pub const DEFAULT_DIO_DOUBLINGS: u8 = 8;

/// Opaque routing instance handle
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(pub u8);

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.0)
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Link color advertised in the routing metric container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum NodeColor {
    #[default]
    White,
    Red,
}

impl NodeColor {
    pub fn name(self) -> &'static str {
        match self {
            NodeColor::White => "WHITE",
            NodeColor::Red => "RED",
        }
    }
}

/// Parameters pushed to the routing instance once at startup
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceConfig {
    pub color: NodeColor,
    pub dio_doublings: u8,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        InstanceConfig {
            color: NodeColor::White,
            dio_doublings: DEFAULT_DIO_DOUBLINGS,
        }
    }
}

/// Default route as reported by the routing layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DefaultRoute {
    pub via: Ipv6Addr,
    pub lifetime: Duration,
    pub infinite: bool,
}

/// One downward route entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: Ipv6Addr,
    pub next_hop: Ipv6Addr,
    pub lifetime: Duration,
}

/// The routing layer as seen by the probe
pub trait Routing {
    /// Current instance handle, if the node has joined one
    fn instance(&self) -> Option<InstanceHandle>;

    /// Apply startup parameters to an instance
    fn configure_instance(
        &mut self,
        instance: InstanceHandle,
        config: InstanceConfig,
    ) -> CoralResult<()>;

    /// Request a local repair of the instance
    fn repair(&mut self, instance: InstanceHandle) -> CoralResult<()>;

    fn default_route(&self) -> Option<DefaultRoute>;

    /// All downward routes, in table order
    fn routes(&self) -> Vec<RouteEntry>;

    fn route_count(&self) -> usize {
        self.routes().len()
    }
}

/// Last byte of an address, the short node label used in route dumps
#[inline]
pub fn short_label(addr: &Ipv6Addr) -> u8 {
    addr.octets()[15]
}
