//! Direct digital synthesis sidetone generator
//!
//! A 32-bit phase accumulator advances by the tuning word on every
//! timebase tick; its top 8 bits index a 256-entry sine table. The
//! enable flag gates only the output sample, so the phase keeps running
//! while muted and re-enabling never clicks.

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::timebase::{Timebase, TICK_RATE_HZ};

/// Number of entries in the sine table
pub const SINE_TABLE_SIZE: usize = 256;

/// One full sine period, unsigned 8-bit, centred on 127
pub static SINE_TABLE: [u8; SINE_TABLE_SIZE] = [
    127, 130, 133, 136, 139, 143, 146, 149, 152, 155, 158, 161, 164, 167, 170, 173,
    176, 178, 181, 184, 187, 190, 192, 195, 198, 200, 203, 205, 208, 210, 212, 215,
    217, 219, 221, 223, 225, 227, 229, 231, 233, 234, 236, 238, 239, 240, 242, 243,
    244, 245, 247, 248, 249, 249, 250, 251, 252, 252, 253, 253, 253, 254, 254, 254,
    254, 254, 254, 254, 253, 253, 253, 252, 252, 251, 250, 249, 249, 248, 247, 245,
    244, 243, 242, 240, 239, 238, 236, 234, 233, 231, 229, 227, 225, 223, 221, 219,
    217, 215, 212, 210, 208, 205, 203, 200, 198, 195, 192, 190, 187, 184, 181, 178,
    176, 173, 170, 167, 164, 161, 158, 155, 152, 149, 146, 143, 139, 136, 133, 130,
    127, 124, 121, 118, 115, 111, 108, 105, 102, 99, 96, 93, 90, 87, 84, 81,
    78, 76, 73, 70, 67, 64, 62, 59, 56, 54, 51, 49, 46, 44, 42, 39,
    37, 35, 33, 31, 29, 27, 25, 23, 21, 20, 18, 16, 15, 14, 12, 11,
    10, 9, 7, 6, 5, 5, 4, 3, 2, 2, 1, 1, 1, 0, 0, 0,
    0, 0, 0, 0, 1, 1, 1, 2, 2, 3, 4, 5, 5, 6, 7, 9,
    10, 11, 12, 14, 15, 16, 18, 20, 21, 23, 25, 27, 29, 31, 33, 35,
    37, 39, 42, 44, 46, 49, 51, 54, 56, 59, 62, 64, 67, 70, 73, 76,
    78, 81, 84, 87, 90, 93, 96, 99, 102, 105, 108, 111, 115, 118, 121, 124,
];

/// Per-tick phase increment for `frequency_hz`: round(2^32 * f / TICK_RATE_HZ)
///
/// No range checking: negative or NaN input gives 0, anything past the
/// 32-bit range saturates.
pub fn tuning_word(frequency_hz: f32) -> u32 {
    let word = 4_294_967_296.0 * frequency_hz as f64 / TICK_RATE_HZ + 0.5;
    // `as` saturates and maps NaN to zero
    word as u32
}

/// Tone settings shared between the poll loop (writer) and the timer callback (reader)
///
/// `portable-atomic` keeps the 32-bit tuning word tear-free on targets
/// without native 32-bit loads by wrapping the access in a critical section.
pub struct ToneControl {
    tuning_word: AtomicU32,
    enabled: AtomicBool,
}

impl ToneControl {
    pub const fn new() -> Self {
        Self {
            tuning_word: AtomicU32::new(0),
            enabled: AtomicBool::new(false),
        }
    }

    /// Change the tone frequency. Affects only the rate of phase advance.
    pub fn set_frequency(&self, frequency_hz: f32) {
        self.set_tuning_word(tuning_word(frequency_hz));
    }

    pub fn set_tuning_word(&self, word: u32) {
        self.tuning_word.store(word, Ordering::Release);
    }

    #[inline]
    pub fn tuning_word(&self) -> u32 {
        self.tuning_word.load(Ordering::Acquire)
    }

    /// Gate the output sample. Never touches the phase.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Default for ToneControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer-callback half of the oscillator; owns the phase accumulator
pub struct Synthesizer<'a> {
    phase: u32,
    tone: &'a ToneControl,
    timebase: &'a Timebase,
}

impl<'a> Synthesizer<'a> {
    pub const fn new(tone: &'a ToneControl, timebase: &'a Timebase) -> Self {
        Self {
            phase: 0,
            tone,
            timebase,
        }
    }

    /// One timer period: advance phase, pick the sample, advance the timebase.
    ///
    /// Bounded, allocation-free and lock-free; safe to run from the
    /// highest-priority interrupt.
    #[inline]
    pub fn tick(&mut self) -> u8 {
        self.phase = self.phase.wrapping_add(self.tone.tuning_word());
        let index = (self.phase >> 24) as usize;

        let sample = if self.tone.is_enabled() {
            SINE_TABLE[index]
        } else {
            0
        };

        self.timebase.advance();
        sample
    }

    /// Current phase accumulator value
    pub fn phase(&self) -> u32 {
        self.phase
    }
}
