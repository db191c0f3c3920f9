//! CORAL Test Harness - Deterministic probe simulation
//!
//! This crate provides:
//! - A seeded lossy link between the node and its peer
//! - A routing double that records every call
//! - A harness that drives a node round by round on a manual clock

pub mod harness;
pub mod link;
pub mod routing;

pub use harness::*;
pub use link::*;
pub use routing::*;
