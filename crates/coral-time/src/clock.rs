//! Clock implementations for the probe

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use coral_core::{Tick, TickDuration, TickModulus};

/// Rate of the emulated real-time timer (32768 Hz crystal)
pub const DEFAULT_TICKS_PER_SECOND: u32 = 32_768;

/// A free-running hardware counter that wraps at a fixed modulus
pub trait TickClock {
    /// Current counter value, already reduced onto the tick space
    fn now(&self) -> Tick;

    /// Wrap point of the counter
    fn modulus(&self) -> TickModulus;

    /// Counter rate, used only to render ticks as wall-clock time
    fn ticks_per_second(&self) -> u32;

    /// Ticks elapsed since `earlier`, modulo the wrap point
    fn elapsed_since(&self, earlier: Tick) -> TickDuration {
        self.now().wrapping_since(earlier, self.modulus())
    }
}

/// Emulated hardware timer driven by the OS monotonic clock
/// INVARIANT: the underlying counter never goes backwards; only the
/// reduced reading wraps
pub struct MonotonicTickClock {
    /// Reference instant (counter zero)
    origin: Instant,
    /// Counter offset at the origin
    offset: u64,
    ticks_per_second: u32,
    modulus: TickModulus,
}

impl MonotonicTickClock {
    pub fn new(ticks_per_second: u32, modulus: TickModulus) -> Self {
        Self::with_offset(ticks_per_second, modulus, 0)
    }

    /// Start the counter at `offset` instead of zero
    pub fn with_offset(ticks_per_second: u32, modulus: TickModulus, offset: u64) -> Self {
        MonotonicTickClock {
            origin: Instant::now(),
            offset,
            ticks_per_second: ticks_per_second.max(1),
            modulus,
        }
    }

    fn counter(&self) -> u64 {
        let elapsed = self.origin.elapsed();
        let ticks = elapsed.as_nanos() * u128::from(self.ticks_per_second) / 1_000_000_000;
        self.offset.wrapping_add(ticks as u64)
    }

    /// Time for one full wrap of the counter
    pub fn wrap_period(&self) -> Duration {
        let secs = self.modulus.get() as f64 / f64::from(self.ticks_per_second);
        Duration::from_secs_f64(secs)
    }
}

impl Default for MonotonicTickClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICKS_PER_SECOND, TickModulus::FULL)
    }
}

impl TickClock for MonotonicTickClock {
    fn now(&self) -> Tick {
        self.modulus.reduce(self.counter())
    }

    fn modulus(&self) -> TickModulus {
        self.modulus
    }

    fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

/// Manually driven clock. Clones share the same counter, so a test can
/// keep one handle and hand another to the node.
#[derive(Clone)]
pub struct ManualClock {
    counter: Arc<Mutex<u64>>,
    ticks_per_second: u32,
    modulus: TickModulus,
}

impl ManualClock {
    pub fn new(modulus: TickModulus) -> Self {
        ManualClock {
            counter: Arc::new(Mutex::new(0)),
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            modulus,
        }
    }

    /// Jump to an absolute counter value. May move backwards, which is how
    /// tests model a timer reset.
    pub fn set(&self, raw: u64) {
        *self.counter.lock() = raw;
    }

    pub fn advance(&self, ticks: u64) {
        let mut counter = self.counter.lock();
        *counter = counter.wrapping_add(ticks);
    }

    /// Advance by a wall-clock span at the clock's tick rate
    pub fn advance_by(&self, dt: Duration) {
        let ticks = dt.as_nanos() * u128::from(self.ticks_per_second) / 1_000_000_000;
        self.advance(ticks as u64);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(TickModulus::FULL)
    }
}

impl TickClock for ManualClock {
    fn now(&self) -> Tick {
        self.modulus.reduce(*self.counter.lock())
    }

    fn modulus(&self) -> TickModulus {
        self.modulus
    }

    fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicTickClock::default();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = clock.elapsed_since(t1);

        // ~327 ticks for 10ms at 32768 Hz
        assert!(elapsed.as_ticks() >= 300);
        assert!(elapsed.to_duration(clock.ticks_per_second()) >= Duration::from_millis(9));
    }

    #[test]
    fn test_monotonic_clock_wraps() {
        let modulus = TickModulus::new(1000).unwrap();
        let clock = MonotonicTickClock::with_offset(DEFAULT_TICKS_PER_SECOND, modulus, 999);
        assert!(clock.now().raw() < 1000);
        assert_eq!(clock.wrap_period().as_millis(), 30);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::default();
        let handle = clock.clone();

        handle.set(1000);
        assert_eq!(clock.now(), Tick(1000));

        handle.advance(50);
        assert_eq!(clock.elapsed_since(Tick(1000)), TickDuration(50));
    }

    #[test]
    fn test_manual_clock_wraps_at_modulus() {
        let clock = ManualClock::new(TickModulus::HALF);
        clock.set(65_530);
        let sent = clock.now();
        clock.advance(50);
        assert_eq!(clock.now(), Tick(44));
        assert_eq!(clock.elapsed_since(sent), TickDuration(50));
    }

    #[test]
    fn test_manual_clock_advance_by() {
        let clock = ManualClock::default();
        clock.advance_by(Duration::from_millis(500));
        assert_eq!(clock.now(), Tick(16_384));
    }
}
