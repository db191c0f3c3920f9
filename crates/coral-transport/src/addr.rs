//! Peer addressing
//!
//! The peer lives at a fixed interface identifier under the mesh prefix.
//! Only the upper 64 bits of the prefix are used.

use std::fmt;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};

use coral_core::{CoralError, CoralResult};

/// Default mesh prefix
pub const DEFAULT_PREFIX: Ipv6Addr = Ipv6Addr::new(0xfd00, 0, 0, 0, 0, 0, 0, 0);

/// Interface identifier of the peer (`::ff:fe00:2`)
pub const DEFAULT_PEER_IID: InterfaceId = InterfaceId([0, 0x00ff, 0xfe00, 2]);

/// Destination port on the peer
pub const DEFAULT_REMOTE_PORT: u16 = 7000;

/// Local source port
pub const DEFAULT_LOCAL_PORT: u16 = 6000;

/// Lower 64 bits of an IPv6 address, as four 16-bit groups
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub [u16; 4]);

impl InterfaceId {
    /// Parse an IID written as an address suffix, e.g. `::ff:fe00:2`.
    /// Anything set in the upper 64 bits is rejected.
    pub fn parse(s: &str) -> CoralResult<Self> {
        let addr: Ipv6Addr = s
            .parse()
            .map_err(|_| CoralError::InvalidAddress(s.to_string()))?;
        let segs = addr.segments();
        if segs[..4].iter().any(|&s| s != 0) {
            return Err(CoralError::InvalidAddress(format!(
                "{} sets prefix bits",
                s
            )));
        }
        Ok(InterfaceId([segs[4], segs[5], segs[6], segs[7]]))
    }
}

/// Written as an address suffix, the form `parse` accepts
impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}", Ipv6Addr::new(0, 0, 0, 0, a, b, c, d))
    }
}

/// Combine the upper half of `prefix` with `iid`
pub fn derive_address(prefix: Ipv6Addr, iid: InterfaceId) -> Ipv6Addr {
    let p = prefix.segments();
    let i = iid.0;
    Ipv6Addr::new(p[0], p[1], p[2], p[3], i[0], i[1], i[2], i[3])
}

/// Socket address of the peer under `prefix`
pub fn peer_socket_addr(prefix: Ipv6Addr, iid: InterfaceId, port: u16) -> SocketAddr {
    SocketAddr::V6(SocketAddrV6::new(derive_address(prefix, iid), port, 0, 0))
}
