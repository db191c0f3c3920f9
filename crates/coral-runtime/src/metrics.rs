//! Periodic metrics report

use std::fmt;

use coral_core::TickDuration;

/// One report line: `R:<round>, RTT:<ticks>`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetricsReport {
    pub round: u32,
    pub last_rtt: Option<TickDuration>,
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Collectors parse an integer; no sample yet prints as 0
        let rtt = self.last_rtt.map(|d| d.as_ticks()).unwrap_or(0);
        write!(f, "R:{}, RTT:{}", self.round, rtt)
    }
}

/// Round counter of the metrics loop. Reads probe state, never writes it.
#[derive(Clone, Debug, Default)]
pub struct MetricsReporter {
    round: u32,
}

impl MetricsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the report for this interval and move to the next round.
    /// The round advances whether or not a fresh RTT exists.
    pub fn report(&mut self, last_rtt: Option<TickDuration>) -> MetricsReport {
        let report = MetricsReport {
            round: self.round,
            last_rtt,
        };
        self.round = self.round.wrapping_add(1);
        report
    }

    /// Round number the next report will carry
    pub fn round(&self) -> u32 {
        self.round
    }
}
