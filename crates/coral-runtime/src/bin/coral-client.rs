//! CORAL probe client
//!
//! Sends a jittered, sequenced probe to the mesh peer every period, tracks
//! RTT and cumulative loss, and prints a metrics line every interval.
//! Console: `r` dumps routes, `b` presses the repair button.
//! On unix, SIGUSR1 also presses the repair button.

use std::net::{Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::error;

use coral_core::CoralResult;
use coral_runtime::{
    init_tracing, startup_banner, ConsoleSink, EventSources, LogFormat, NodeConfig, ProbeNode,
    ProbeRuntime, StaticRouting, StdoutSink,
};
use coral_time::MonotonicTickClock;
use coral_transport::UdpTransport;

#[derive(Parser, Debug)]
#[command(name = "coral-client", about = "Mesh RTT and loss probe")]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Peer socket address, overriding prefix derivation
    #[arg(long)]
    peer: Option<SocketAddr>,

    /// Mesh prefix the peer address is derived from
    #[arg(long)]
    prefix: Option<Ipv6Addr>,

    /// Peer interface identifier, e.g. ::ff:fe00:2
    #[arg(long)]
    peer_iid: Option<String>,

    /// Probe period, e.g. 60s
    #[arg(long, value_parser = humantime::parse_duration)]
    period: Option<std::time::Duration>,

    #[arg(long)]
    local_port: Option<u16>,

    #[arg(long)]
    remote_port: Option<u16>,

    /// Print `#A` loss annotations before each send
    #[arg(long)]
    annotate: bool,

    /// Seed for the send jitter
    #[arg(long)]
    seed: Option<u64>,

    /// text or json
    #[arg(long, default_value = "text")]
    log_format: LogFormat,
}

impl Cli {
    fn load_config(&self) -> CoralResult<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)?,
            None => NodeConfig::default(),
        };

        if let Some(peer) = self.peer {
            config.peer = Some(peer);
        }
        if let Some(prefix) = self.prefix {
            config.prefix = prefix;
        }
        if let Some(iid) = &self.peer_iid {
            config.peer_iid = iid.clone();
        }
        if let Some(period) = self.period {
            config.probe.send_interval = period;
        }
        if let Some(port) = self.local_port {
            config.local_port = port;
        }
        if let Some(port) = self.remote_port {
            config.remote_port = port;
        }
        if self.annotate {
            config.probe.annotate = true;
        }
        if self.seed.is_some() {
            config.probe.seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format, "info");

    if let Err(e) = run(cli).await {
        error!("{}", e);
        return Err(e.into());
    }
    Ok(())
}

async fn run(cli: Cli) -> CoralResult<()> {
    let config = cli.load_config()?;
    let peer = config.peer_addr()?;

    let clock = MonotonicTickClock::new(config.ticks_per_second, config.modulus()?);
    let routing = StaticRouting::from_config(&config.routing);
    let node = ProbeNode::start(
        config.probe.clone(),
        peer,
        clock,
        routing,
        Box::new(StdoutSink),
    )?;

    let transport = UdpTransport::bind(config.local_addr()).await.map_err(|e| {
        error!("No UDP connection available, exiting the process!");
        e
    })?;

    let mut console = StdoutSink;
    for line in startup_banner(peer, transport.local_addr(), &config.local_addresses) {
        console.line(&line);
    }

    let (sources, trigger_tx, console_tx) = EventSources::channel(16);
    spawn_console_reader(console_tx);
    spawn_button(trigger_tx)?;

    let runtime = ProbeRuntime::new(node, transport, config.packet_buffer);
    runtime
        .run(sources, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

fn spawn_console_reader(tx: mpsc::Sender<String>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(unix)]
fn spawn_button(tx: mpsc::Sender<()>) -> CoralResult<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut presses = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while presses.recv().await.is_some() {
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_button(tx: mpsc::Sender<()>) -> CoralResult<()> {
    // Only the console `b` command presses the button here
    drop(tx);
    Ok(())
}
