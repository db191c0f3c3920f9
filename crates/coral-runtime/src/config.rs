//! Node configuration
//!
//! Every field has a default matching the deployed mesh client, so an
//! empty JSON object is a valid configuration file. Durations are written
//! in humantime form (`"60s"`, `"1m 30s"`).

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use coral_core::{CoralError, CoralResult, TickDuration, TickModulus, DEFAULT_DIO_DOUBLINGS};
use coral_time::DEFAULT_TICKS_PER_SECOND;
use coral_transport::{
    peer_socket_addr, InterfaceId, DEFAULT_LOCAL_PORT, DEFAULT_PEER_IID, DEFAULT_PREFIX,
    DEFAULT_REMOTE_PORT,
};

/// Probe send period P
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(60);

/// Metrics reporting interval
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(60);

/// Elapsed values at or above this are treated as timer artifacts
pub const DEFAULT_RTT_THRESHOLD: TickDuration = TickDuration(100_000);

/// Probe timing and measurement parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Period of the send scheduler; jitter is drawn from `[0, send_interval)`
    #[serde(with = "humantime_duration")]
    pub send_interval: Duration,
    #[serde(with = "humantime_duration")]
    pub metrics_interval: Duration,
    pub rtt_threshold_ticks: u32,
    pub dio_doublings: u8,
    pub annotate: bool,
    /// Fixed RNG seed for the jitter scheduler
    pub seed: Option<u64>,
}

impl ProbeConfig {
    pub fn rtt_threshold(&self) -> TickDuration {
        TickDuration(self.rtt_threshold_ticks)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            send_interval: DEFAULT_SEND_INTERVAL,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            rtt_threshold_ticks: DEFAULT_RTT_THRESHOLD.as_ticks(),
            dio_doublings: DEFAULT_DIO_DOUBLINGS,
            annotate: false,
            seed: None,
        }
    }
}

/// Static default route for hosts without a mesh stack
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultRouteConfig {
    pub via: Ipv6Addr,
    #[serde(with = "humantime_duration")]
    pub lifetime: Duration,
    #[serde(default)]
    pub infinite: bool,
}

/// Static route entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub destination: Ipv6Addr,
    pub next_hop: Ipv6Addr,
    #[serde(with = "humantime_duration")]
    pub lifetime: Duration,
}

/// Routing collaborator settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Instance id; `None` models a node that has not joined a DAG
    pub instance: Option<u8>,
    pub default_route: Option<DefaultRouteConfig>,
    pub routes: Vec<RouteConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig {
            instance: Some(30),
            default_route: None,
            routes: Vec::new(),
        }
    }
}

/// Full node configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub probe: ProbeConfig,
    /// Mesh prefix; the peer lives at `prefix + peer_iid`
    pub prefix: Ipv6Addr,
    pub peer_iid: String,
    /// Explicit peer, overriding prefix derivation
    pub peer: Option<SocketAddr>,
    pub bind_addr: IpAddr,
    /// Addresses this node answers on, printed at startup. Empty means
    /// only the bind address is known.
    pub local_addresses: Vec<IpAddr>,
    pub local_port: u16,
    pub remote_port: u16,
    pub ticks_per_second: u32,
    pub tick_modulus: u64,
    /// Depth of the inbound datagram channel
    pub packet_buffer: usize,
    pub routing: RoutingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            probe: ProbeConfig::default(),
            prefix: DEFAULT_PREFIX,
            peer_iid: DEFAULT_PEER_IID.to_string(),
            peer: None,
            bind_addr: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            local_addresses: Vec::new(),
            local_port: DEFAULT_LOCAL_PORT,
            remote_port: DEFAULT_REMOTE_PORT,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            tick_modulus: TickModulus::FULL.get(),
            packet_buffer: 64,
            routing: RoutingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> CoralResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> CoralResult<Self> {
        serde_json::from_str(text).map_err(|e| CoralError::InvalidConfig(e.to_string()))
    }

    /// Reject values the runtime cannot operate with
    pub fn validate(&self) -> CoralResult<()> {
        if self.probe.send_interval.is_zero() {
            return Err(CoralError::InvalidConfig(
                "send_interval must be non-zero".into(),
            ));
        }
        if self.probe.metrics_interval.is_zero() {
            return Err(CoralError::InvalidConfig(
                "metrics_interval must be non-zero".into(),
            ));
        }
        if self.probe.rtt_threshold_ticks == 0 {
            return Err(CoralError::InvalidConfig(
                "rtt_threshold_ticks must be non-zero".into(),
            ));
        }
        if self.ticks_per_second == 0 {
            return Err(CoralError::InvalidConfig(
                "ticks_per_second must be non-zero".into(),
            ));
        }
        if self.packet_buffer == 0 {
            return Err(CoralError::InvalidConfig(
                "packet_buffer must be non-zero".into(),
            ));
        }
        self.modulus()?;
        self.peer_addr()?;
        Ok(())
    }

    pub fn modulus(&self) -> CoralResult<TickModulus> {
        TickModulus::new(self.tick_modulus)
    }

    /// Peer socket address: the explicit override, or prefix + IID
    pub fn peer_addr(&self) -> CoralResult<SocketAddr> {
        if let Some(peer) = self.peer {
            return Ok(peer);
        }
        let iid = InterfaceId::parse(&self.peer_iid)?;
        Ok(peer_socket_addr(self.prefix, iid, self.remote_port))
    }

    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.local_port)
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.probe.send_interval, Duration::from_secs(60));
        assert_eq!(config.probe.rtt_threshold(), TickDuration(100_000));
        assert_eq!(config.probe.dio_doublings, 8);
        assert_eq!(config.local_port, 6000);
        assert_eq!(config.remote_port, 7000);
        assert_eq!(config.peer_iid, "::ff:fe00:2");
        assert!(config.local_addresses.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_peer_addr() {
        let peer = NodeConfig::default().peer_addr().unwrap();
        assert_eq!(peer, "[fd00::ff:fe00:2]:7000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = NodeConfig::from_json("{}").unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_json_overrides() {
        let config = NodeConfig::from_json(
            r#"{
                "probe": { "send_interval": "30s", "annotate": true, "seed": 7 },
                "peer": "127.0.0.1:7000",
                "tick_modulus": 65536,
                "local_addresses": ["fd00::ff:fe00:1", "fe80::ff:fe00:1"],
                "routing": {
                    "instance": 1,
                    "routes": [
                        { "destination": "fd00::3", "next_hop": "fe80::3", "lifetime": "10m" }
                    ]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.probe.send_interval, Duration::from_secs(30));
        assert_eq!(config.probe.metrics_interval, Duration::from_secs(60));
        assert!(config.probe.annotate);
        assert_eq!(config.probe.seed, Some(7));
        assert_eq!(config.modulus().unwrap(), TickModulus::HALF);
        assert_eq!(config.routing.routes[0].lifetime, Duration::from_secs(600));
        assert_eq!(config.peer_addr().unwrap().port(), 7000);
        assert_eq!(config.local_addresses.len(), 2);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = NodeConfig::default();
        config.probe.send_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.tick_modulus = 1;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.peer_iid = "fd00::1".into();
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.probe.rtt_threshold_ticks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_duration_rejected() {
        let err = NodeConfig::from_json(r#"{ "probe": { "send_interval": "soon" } }"#);
        assert!(matches!(err, Err(CoralError::InvalidConfig(_))));
    }
}
