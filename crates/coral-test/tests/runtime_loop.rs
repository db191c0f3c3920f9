//! The async driver against a real UDP echo peer on loopback

use std::net::SocketAddr;
use std::time::Duration;

use coral_core::TickModulus;
use coral_runtime::{EventSources, MemorySink, ProbeConfig, ProbeNode, ProbeRuntime};
use coral_test::RecordingRouting;
use coral_time::{MonotonicTickClock, DEFAULT_TICKS_PER_SECOND};
use coral_transport::UdpTransport;

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

async fn spawn_echo_peer() -> SocketAddr {
    let peer = UdpTransport::bind(loopback()).await.unwrap();
    let addr = peer.local_addr();
    tokio::spawn(async move {
        while let Ok((bytes, from)) = peer.recv_from().await {
            if peer.send_to(&bytes, from).await.is_err() {
                break;
            }
        }
    });
    addr
}

fn fast_config() -> ProbeConfig {
    ProbeConfig {
        send_interval: Duration::from_millis(40),
        metrics_interval: Duration::from_millis(100),
        seed: Some(1),
        ..ProbeConfig::default()
    }
}

#[tokio::test]
async fn test_probe_loop_measures_rtt() {
    let peer = spawn_echo_peer().await;
    let routing = RecordingRouting::joined(30);
    let sink = MemorySink::new();

    let node = ProbeNode::start(
        fast_config(),
        peer,
        MonotonicTickClock::new(DEFAULT_TICKS_PER_SECOND, TickModulus::FULL),
        routing.clone(),
        Box::new(sink.clone()),
    )
    .unwrap();
    let transport = UdpTransport::bind(loopback()).await.unwrap();

    let (sources, trigger_tx, console_tx) = EventSources::channel(4);
    trigger_tx.send(()).await.unwrap();
    console_tx.send("b".to_string()).await.unwrap();

    let runtime = ProbeRuntime::new(node, transport, 16);
    let node = runtime
        .run(sources, tokio::time::sleep(Duration::from_millis(500)))
        .await
        .unwrap();

    let state = node.state();
    assert!(state.sequence() >= 5, "sequence {}", state.sequence());
    assert!(state.replies_received() + 1 >= state.sequence());
    assert!(state.last_rtt().is_some());
    assert_eq!(node.stats().send_failures, 0);
    assert_eq!(routing.repairs(), 2);

    let reports: Vec<_> = sink
        .lines()
        .into_iter()
        .filter(|l| l.starts_with("R:"))
        .collect();
    assert!(reports.len() >= 3, "reports {:?}", reports);
    assert!(reports[0].starts_with("R:0, "));
    assert_eq!(node.metrics_round() as usize, reports.len());
}

#[tokio::test]
async fn test_shutdown_before_first_period() {
    let peer = spawn_echo_peer().await;
    let node = ProbeNode::start(
        ProbeConfig {
            seed: Some(2),
            ..ProbeConfig::default()
        },
        peer,
        MonotonicTickClock::default(),
        RecordingRouting::joined(30),
        Box::new(MemorySink::new()),
    )
    .unwrap();
    let transport = UdpTransport::bind(loopback()).await.unwrap();
    let (sources, _trigger_tx, _console_tx) = EventSources::channel(1);

    let node = ProbeRuntime::new(node, transport, 4)
        .run(sources, async {})
        .await
        .unwrap();

    assert_eq!(node.state().sequence(), 0);
    assert_eq!(node.metrics_round(), 0);
}
