//! Lossy link simulation
//!
//! Models the radio path between the node and its peer:
//! - Base latency plus uniform jitter
//! - Random loss
//! - Forced drops for scripted scenarios

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Link configuration
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// One-way base latency
    pub base_latency: Duration,
    /// Upper bound of the uniform jitter added to each packet
    pub max_jitter: Duration,
    /// Packet loss rate (0.0 - 1.0)
    pub loss_rate: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            base_latency: Duration::from_millis(20),
            max_jitter: Duration::from_millis(10),
            loss_rate: 0.0,
        }
    }
}

impl LinkConfig {
    /// Fixed latency, no jitter, no loss
    pub fn perfect(latency: Duration) -> Self {
        LinkConfig {
            base_latency: latency,
            max_jitter: Duration::ZERO,
            loss_rate: 0.0,
        }
    }

    /// Lossy multi-hop path
    pub fn lossy(loss_rate: f64) -> Self {
        LinkConfig {
            base_latency: Duration::from_millis(80),
            max_jitter: Duration::from_millis(40),
            loss_rate,
        }
    }
}

#[derive(Clone, Debug)]
struct InFlight {
    data: Bytes,
    delivery_time: Duration,
}

/// Link statistics
#[derive(Clone, Debug, Default)]
pub struct LinkStats {
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_lost: u64,
}

impl LinkStats {
    pub fn loss_rate(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.packets_lost as f64 / self.packets_sent as f64
        }
    }
}

/// One direction of the simulated path
pub struct LossyLink {
    config: LinkConfig,
    rng: StdRng,
    in_flight: VecDeque<InFlight>,
    current_time: Duration,
    /// Packets to drop unconditionally before random loss applies
    forced_drops: u32,
    stats: LinkStats,
}

impl LossyLink {
    pub fn new(config: LinkConfig, seed: u64) -> Self {
        LossyLink {
            config,
            rng: StdRng::seed_from_u64(seed),
            in_flight: VecDeque::new(),
            current_time: Duration::ZERO,
            forced_drops: 0,
            stats: LinkStats::default(),
        }
    }

    /// Drop the next `count` packets regardless of the loss rate
    pub fn drop_next(&mut self, count: u32) {
        self.forced_drops += count;
    }

    pub fn send(&mut self, data: Bytes) {
        self.stats.packets_sent += 1;

        if self.should_drop() {
            self.stats.packets_lost += 1;
            return;
        }

        let jitter = if self.config.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = self.config.max_jitter.as_micros() as u64;
            Duration::from_micros(Uniform::new_inclusive(0, max).sample(&mut self.rng))
        };
        let delivery_time = self.current_time + self.config.base_latency + jitter;

        // Keep the queue ordered by delivery time
        let pos = self
            .in_flight
            .iter()
            .position(|p| p.delivery_time > delivery_time)
            .unwrap_or(self.in_flight.len());
        self.in_flight.insert(pos, InFlight { data, delivery_time });
    }

    fn should_drop(&mut self) -> bool {
        if self.forced_drops > 0 {
            self.forced_drops -= 1;
            return true;
        }
        self.config.loss_rate > 0.0 && self.rng.gen::<f64>() < self.config.loss_rate
    }

    /// Advance time and collect delivered packets
    pub fn tick(&mut self, dt: Duration) -> Vec<Bytes> {
        self.current_time += dt;

        let mut delivered = Vec::new();
        while self
            .in_flight
            .front()
            .is_some_and(|p| p.delivery_time <= self.current_time)
        {
            if let Some(packet) = self.in_flight.pop_front() {
                self.stats.packets_delivered += 1;
                delivered.push(packet.data);
            }
        }
        delivered
    }

    /// Time until the next packet lands, if any is in flight
    pub fn next_delivery(&self) -> Option<Duration> {
        self.in_flight
            .front()
            .map(|p| p.delivery_time.saturating_sub(self.current_time))
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn current_time(&self) -> Duration {
        self.current_time
    }
}
