//! UDP socket shared by the probe sender and the receive task

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use coral_core::{CoralError, CoralResult};

/// Largest datagram accepted from the peer (IPv6 minimum MTU).
/// Longer datagrams are truncated.
pub const MAX_DATAGRAM_SIZE: usize = 1280;

/// Inbound datagrams with their source
pub type PacketReceiver = mpsc::Receiver<(Bytes, SocketAddr)>;

fn transport_error(e: io::Error) -> CoralError {
    CoralError::TransportError(e.to_string())
}

/// A bound UDP socket. Cheap to share: sending and the receive task use
/// the same socket concurrently.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> CoralResult<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(transport_error)?;
        let local_addr = socket.local_addr().map_err(transport_error)?;
        debug!(local = %local_addr, "udp socket bound");

        Ok(UdpTransport {
            socket: Arc::new(socket),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Hand one datagram to the network. Success says nothing about delivery.
    pub async fn send_to(&self, payload: &[u8], dest: SocketAddr) -> CoralResult<()> {
        self.socket
            .send_to(payload, dest)
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    /// Wait for the next datagram
    pub async fn recv_from(&self) -> CoralResult<(Bytes, SocketAddr)> {
        let mut buf = BytesMut::with_capacity(MAX_DATAGRAM_SIZE);
        let (_, from) = self
            .socket
            .recv_buf_from(&mut buf)
            .await
            .map_err(transport_error)?;
        Ok((buf.freeze(), from))
    }

    /// Move receiving onto a background task feeding a channel of `depth`.
    /// The task ends once the returned receiver is dropped.
    pub fn spawn_receiver(&self, depth: usize) -> PacketReceiver {
        let (tx, rx) = mpsc::channel(depth.max(1));
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            let mut buf = BytesMut::with_capacity(MAX_DATAGRAM_SIZE);
            loop {
                buf.reserve(MAX_DATAGRAM_SIZE);
                let received = tokio::select! {
                    _ = tx.closed() => break,
                    received = socket.recv_buf_from(&mut buf) => received,
                };

                match received {
                    Ok((_, from)) => {
                        let packet = buf.split().freeze();
                        if tx.send((packet, from)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        buf.clear();
                        warn!("udp receive error: {}", e);
                    }
                }
            }
            debug!("udp receive task stopped");
        });

        rx
    }
}
