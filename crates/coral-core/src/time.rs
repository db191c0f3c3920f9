//! Tick primitives for the CORAL probe
//!
//! The node's hardware timer is a free-running counter that wraps at a
//! fixed modulus. Elapsed time between two readings is always computed
//! modulo that wrap point, never with plain subtraction.

use std::fmt;
use std::time::Duration;

use crate::{CoralError, CoralResult};

/// Wrap point of a hardware tick counter.
/// INVARIANT: 2 <= modulus <= 2^32, so every reduced tick fits a `u32`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickModulus(u64);

impl TickModulus {
    /// A full 32-bit counter
    pub const FULL: TickModulus = TickModulus(1 << 32);

    /// A 16-bit counter, as found on small MCU timers
    pub const HALF: TickModulus = TickModulus(1 << 16);

    pub fn new(modulus: u64) -> CoralResult<Self> {
        if (2..=Self::FULL.0).contains(&modulus) {
            Ok(TickModulus(modulus))
        } else {
            Err(CoralError::InvalidModulus(modulus))
        }
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Reduce a free-running counter value onto the wrapped tick space
    #[inline]
    pub fn reduce(self, counter: u64) -> Tick {
        Tick((counter % self.0) as u32)
    }
}

impl Default for TickModulus {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Debug for TickModulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mod({})", self.0)
    }
}

/// A hardware timer reading
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tick(pub u32);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Ticks elapsed from `earlier` to `self` on a counter wrapping at
    /// `modulus`. Exact whenever the true elapsed time is below the modulus,
    /// including when `self < earlier` numerically.
    #[inline]
    pub fn wrapping_since(self, earlier: Tick, modulus: TickModulus) -> TickDuration {
        let m = modulus.get();
        let now = u64::from(self.0) % m;
        let then = u64::from(earlier.0) % m;
        TickDuration(((now + m - then) % m) as u32)
    }

    /// Advance by `ticks`, wrapping at `modulus`
    #[inline]
    pub fn wrapping_add(self, ticks: TickDuration, modulus: TickModulus) -> Tick {
        modulus.reduce(u64::from(self.0) + u64::from(ticks.0))
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick({})", self.0)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A span measured in hardware ticks
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TickDuration(pub u32);

impl TickDuration {
    pub const ZERO: TickDuration = TickDuration(0);

    #[inline]
    pub fn as_ticks(self) -> u32 {
        self.0
    }

    /// Convert to wall-clock time for a timer running at `ticks_per_second`
    pub fn to_duration(self, ticks_per_second: u32) -> Duration {
        if ticks_per_second == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(self.0) * 1_000_000_000 / u128::from(ticks_per_second);
        Duration::from_nanos(nanos as u64)
    }
}

impl fmt::Debug for TickDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}

impl fmt::Display for TickDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
