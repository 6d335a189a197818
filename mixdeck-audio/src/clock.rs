//! Transport clock - the single periodic driver of deck playheads

use crate::deck::Deck;
use std::time::Duration;

/// Default clock rate (ticks per second)
pub const DEFAULT_TICK_RATE_HZ: u32 = 30;

/// Fixed-quantum clock advancing every playing deck
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportClock {
    /// Seconds of model time per tick
    quantum: f64,
    ticks: u64,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::from_rate(DEFAULT_TICK_RATE_HZ)
    }
}

impl TransportClock {
    pub fn new(quantum: Duration) -> Self {
        let quantum = quantum.as_secs_f64();
        let quantum = if quantum > 0.0 {
            quantum
        } else {
            1.0 / DEFAULT_TICK_RATE_HZ as f64
        };
        Self { quantum, ticks: 0 }
    }

    pub fn from_rate(rate_hz: u32) -> Self {
        Self {
            quantum: 1.0 / rate_hz.max(1) as f64,
            ticks: 0,
        }
    }

    pub fn quantum(&self) -> f64 {
        self.quantum
    }

    pub fn quantum_duration(&self) -> Duration {
        Duration::from_secs_f64(self.quantum)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Model time elapsed since the clock started
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * self.quantum
    }

    /// Advance all decks by one quantum
    pub fn tick(&mut self, decks: &mut [Deck]) {
        self.ticks += 1;
        for deck in decks.iter_mut() {
            deck.advance(self.quantum);
        }
    }
}
