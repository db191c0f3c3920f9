//! CORAL Transport Layer - UDP datagrams to a fixed peer
//!
//! This crate provides:
//! - UDP transport
//! - Background receive loop feeding a channel
//! - Peer address derivation from a prefix and interface identifier

pub mod addr;
pub mod udp;

pub use addr::*;
pub use udp::*;
