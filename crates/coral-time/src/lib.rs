//! CORAL Time - Hardware tick clocks
//!
//! This crate provides:
//! - The `TickClock` trait used by the probe to read "now"
//! - A monotonic clock that emulates a wrapping MCU timer
//! - A manually driven clock for deterministic tests

pub mod clock;

pub use clock::*;
