//! Free-running timebase advanced by the periodic timer callback
//!
//! All scheduler timing is expressed in ticks of this counter, never in
//! wall-clock time.

use portable_atomic::{AtomicU32, Ordering};

/// Timer reference clock (16 MHz) divided by 510 in phase-correct PWM mode
pub const NOMINAL_TICK_RATE_HZ: f64 = 16_000_000.0 / 510.0;

/// Measured tick rate of the reference board
pub const TICK_RATE_HZ: f64 = 31376.6;

/// Convert milliseconds to ticks using the simplified 125/4 ratio (31.25 kHz)
pub const fn millis_to_ticks(millis: u64) -> u64 {
    millis * 125 / 4
}

/// Convert ticks back to milliseconds using the same ratio
pub const fn ticks_to_millis(ticks: u64) -> u64 {
    ticks * 4 / 125
}

/// Tick counter shared between the timer callback (writer) and the poll loop (reader)
pub struct Timebase {
    ticks: AtomicU32,
}

impl Timebase {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one tick. Only the timer callback may call this.
    #[inline]
    pub fn advance(&self) {
        let current = self.ticks.load(Ordering::Relaxed);
        self.ticks.store(current.wrapping_add(1), Ordering::Release);
    }

    /// Current raw 32-bit tick value (wraps after ~38 hours)
    #[inline]
    pub fn now(&self) -> u32 {
        self.ticks.load(Ordering::Acquire)
    }
}

impl Default for Timebase {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll-context extension of the wrapping 32-bit counter to a monotonic 64-bit tick
///
/// Must observe the counter at least once per wrap period, which the poll
/// loop always does.
#[derive(Copy, Clone, Debug, Default)]
pub struct TickClock {
    epoch: u32,
    last: u32,
}

impl TickClock {
    pub const fn new() -> Self {
        Self { epoch: 0, last: 0 }
    }

    /// Fold a raw counter reading into the monotonic tick
    pub fn extend(&mut self, raw: u32) -> u64 {
        if raw < self.last {
            self.epoch = self.epoch.wrapping_add(1);
        }
        self.last = raw;
        ((self.epoch as u64) << 32) | raw as u64
    }

    /// Read the timebase and extend it
    pub fn now(&mut self, timebase: &Timebase) -> u64 {
        self.extend(timebase.now())
    }
}
