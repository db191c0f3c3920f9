//! CORAL Core - Fundamental types and primitives
//!
//! This crate defines the core types shared by the probe crates:
//! - Tick values of a wrapping hardware timer and their arithmetic
//! - The bounded probe payload
//! - The routing collaborator interface
//! - Error types

pub mod error;
pub mod payload;
pub mod routing;
pub mod time;

pub use error::*;
pub use payload::*;
pub use routing::*;
pub use time::*;
