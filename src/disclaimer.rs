//! Countdown-gated acknowledgment of the api key disclaimer.
//!
//! The user has to wait a fixed number of seconds before the acknowledgment is
//! accepted. The counter only decreases, and once it reaches zero the gate
//! stays unlocked.

use std::time::Duration;

use crate::FormError;

/// How long the user must wait by default, in seconds
pub const DEFAULT_WAIT_SECS: u32 = 10;

/// Tells the user what handing over an api key means, before they do it
pub const DISCLAIMER: &str = "\
To create your ad you must share your API credentials. They are used only to
look up your payment methods and create a single ad, and are never stored.
Keep Binance's default API permissions, which prevent withdrawals, and delete
the API key as soon as the ad has been created.";

/// Counter that unlocks the acknowledgment once it reaches zero
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisclaimerGate {
    total: u32,
    remaining: u32,
    acknowledged: bool,
}

impl Default for DisclaimerGate {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_SECS)
    }
}

impl DisclaimerGate {
    /// A gate that unlocks after `seconds` ticks
    pub fn new(seconds: u32) -> Self {
        Self {
            total: seconds,
            remaining: seconds,
            acknowledged: false,
        }
    }

    /// Seconds left before the gate unlocks
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Fraction of the wait that has elapsed, between 0 and 1
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        f64::from(self.total - self.remaining) / f64::from(self.total)
    }

    /// Whether the acknowledgment may be given
    pub fn is_unlocked(&self) -> bool {
        self.remaining == 0
    }

    /// Whether the acknowledgment has been given
    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// One second has passed. Returns the new remaining count.
    pub fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Accept the disclaimer. Fails while the countdown is still running.
    pub fn acknowledge(&mut self) -> Result<(), FormError> {
        if !self.is_unlocked() {
            return Err(FormError::NotAcknowledged(self.remaining));
        }
        self.acknowledged = true;
        Ok(())
    }

    /// Tick once per `period` until the gate unlocks, calling `on_tick` with
    /// the remaining count after each tick.
    pub async fn count_down(&mut self, period: Duration, mut on_tick: impl FnMut(u32)) {
        let mut interval = tokio::time::interval(period);
        // The first tick of a tokio interval completes immediately
        interval.tick().await;
        while !self.is_unlocked() {
            interval.tick().await;
            on_tick(self.tick());
        }
    }
}
