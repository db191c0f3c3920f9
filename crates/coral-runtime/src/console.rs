//! Operator console: command parsing, route dump and report output
//!
//! Lines written to a [`ConsoleSink`] are the node's operator contract
//! (metrics, route dumps, annotations) and bypass log filtering.

use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use parking_lot::Mutex;

use coral_core::{short_label, Routing};

/// Recognized console commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Dump the default route and the route table
    Routes,
    /// Same effect as pressing the repair button
    Button,
}

impl ConsoleCommand {
    /// Parse one input line. `r` matches on the first character only.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.starts_with('r') {
            return Some(ConsoleCommand::Routes);
        }
        match line {
            "b" | "button" => Some(ConsoleCommand::Button),
            _ => None,
        }
    }
}

/// Render the default route and route table as console lines
pub fn route_dump<R: Routing + ?Sized>(routing: &R) -> Vec<String> {
    let mut lines = Vec::new();

    match routing.default_route() {
        Some(defrt) => lines.push(format!(
            "DefRT: :: -> {:02} lt:{} inf:{}",
            short_label(&defrt.via),
            defrt.lifetime.as_secs(),
            u8::from(defrt.infinite)
        )),
        None => lines.push("DefRT: :: -> NULL".to_string()),
    }

    for route in routing.routes() {
        lines.push(format!(
            "Route: {:02} -> {:02} lt:{}",
            short_label(&route.destination),
            short_label(&route.next_hop),
            route.lifetime.as_secs()
        ));
    }

    lines
}

/// Lines printed once at startup: the peer, the node's own addresses and
/// the port pair. Without configured addresses the bound address stands in,
/// and an unspecified bind address is reported as such.
pub fn startup_banner(peer: SocketAddr, local: SocketAddr, addresses: &[IpAddr]) -> Vec<String> {
    let own = if !addresses.is_empty() {
        let list: Vec<String> = addresses.iter().map(IpAddr::to_string).collect();
        format!("Client addresses: {}", list.join(" "))
    } else if local.ip().is_unspecified() {
        format!("Client addresses: unknown, bound to {}", local.ip())
    } else {
        format!("Client addresses: {}", local.ip())
    };

    vec![
        format!("Server node IP in client: {}", peer.ip()),
        own,
        format!(
            "Created conn with server {} local/remote port {}/{}",
            peer.ip(),
            local.port(),
            peer.port()
        ),
    ]
}

/// Destination for operator-facing lines
pub trait ConsoleSink {
    fn line(&mut self, line: &str);
}

/// Writes lines to stdout
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ConsoleSink for StdoutSink {
    fn line(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        // A closed stdout must not take the node down
        let _ = writeln!(handle, "{}", line);
    }
}

/// Collects lines in memory. Clones share the buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl ConsoleSink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::StaticRouting;
    use crate::config::{DefaultRouteConfig, RouteConfig, RoutingConfig};
    use std::time::Duration;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("r"), Some(ConsoleCommand::Routes));
        assert_eq!(ConsoleCommand::parse("routes\n"), Some(ConsoleCommand::Routes));
        assert_eq!(ConsoleCommand::parse("b"), Some(ConsoleCommand::Button));
        assert_eq!(ConsoleCommand::parse("button"), Some(ConsoleCommand::Button));
        assert_eq!(ConsoleCommand::parse(""), None);
        assert_eq!(ConsoleCommand::parse("x"), None);
    }

    #[test]
    fn test_dump_without_routes() {
        let routing = StaticRouting::new(Some(30));
        assert_eq!(route_dump(&routing), vec!["DefRT: :: -> NULL".to_string()]);
    }

    #[test]
    fn test_dump_with_routes() {
        let routing = StaticRouting::from_config(&RoutingConfig {
            instance: Some(30),
            default_route: Some(DefaultRouteConfig {
                via: "fe80::212:7401:1:101".parse().unwrap(),
                lifetime: Duration::from_secs(1800),
                infinite: false,
            }),
            routes: vec![RouteConfig {
                destination: "fd00::212:7403:3:303".parse().unwrap(),
                next_hop: "fe80::212:7403:3:303".parse().unwrap(),
                lifetime: Duration::from_secs(42),
            }],
        });

        assert_eq!(
            route_dump(&routing),
            vec![
                "DefRT: :: -> 01 lt:1800 inf:0".to_string(),
                "Route: 03 -> 03 lt:42".to_string(),
            ]
        );
    }

    #[test]
    fn test_banner_lists_configured_addresses() {
        let peer: SocketAddr = "[fd00::ff:fe00:2]:7000".parse().unwrap();
        let local: SocketAddr = "[::]:6000".parse().unwrap();
        let addresses: Vec<IpAddr> = vec![
            "fd00::ff:fe00:1".parse().unwrap(),
            "fe80::ff:fe00:1".parse().unwrap(),
        ];

        assert_eq!(
            startup_banner(peer, local, &addresses),
            vec![
                "Server node IP in client: fd00::ff:fe00:2".to_string(),
                "Client addresses: fd00::ff:fe00:1 fe80::ff:fe00:1".to_string(),
                "Created conn with server fd00::ff:fe00:2 local/remote port 6000/7000".to_string(),
            ]
        );
    }

    #[test]
    fn test_banner_without_addresses() {
        let peer: SocketAddr = "[fd00::ff:fe00:2]:7000".parse().unwrap();

        let wildcard = startup_banner(peer, "[::]:6000".parse().unwrap(), &[]);
        assert_eq!(wildcard[1], "Client addresses: unknown, bound to ::");

        let bound = startup_banner(peer, "[fd00::ff:fe00:1]:6000".parse().unwrap(), &[]);
        assert_eq!(bound[1], "Client addresses: fd00::ff:fe00:1");
    }

    #[test]
    fn test_memory_sink_shared() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.line("R:0, RTT:0");
        assert_eq!(sink.lines(), vec!["R:0, RTT:0".to_string()]);
        assert_eq!(sink.take().len(), 1);
        assert!(sink.lines().is_empty());
    }
}
