//! Mode switches, pot mapping and pin-change routing

use portable_atomic::{AtomicBool, Ordering};
use crate::debounce::RawLine;
use crate::types::{AdapterConfig, KeyerTiming};

/// Front panel switch levels, sampled every poll cycle without debouncing
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeSwitches {
    /// Paddle keyer (true) or straight key (false)
    pub automatic: bool,
    /// Squeeze produces alternating elements
    pub iambic: bool,
    /// Tip and ring swapped
    pub inverted: bool,
}

impl Default for ModeSwitches {
    fn default() -> Self {
        Self {
            automatic: false,
            iambic: true,
            inverted: false,
        }
    }
}

/// Filters analog noise by ignoring readings close to the last accepted one
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnalogControl {
    previous: u16,
    delta: u16,
}

impl AnalogControl {
    pub const fn new(delta: u16) -> Self {
        Self { previous: 0, delta }
    }

    /// Returns true and remembers `raw` if it moved by more than the delta
    pub fn accept(&mut self, raw: u16) -> bool {
        if raw.abs_diff(self.previous) <= self.delta {
            return false;
        }
        self.previous = raw;
        true
    }

    pub fn previous(&self) -> u16 {
        self.previous
    }
}

/// Linear pot-to-speed mapping, truncated to whole WPM and clamped
pub fn speed_wpm(config: &AdapterConfig, raw: u16) -> u32 {
    let span = (config.max_wpm - config.min_wpm) as f32;
    let wpm = config.min_wpm + (span / config.max_analog() * raw as f32) as u32;
    if wpm > config.max_wpm {
        config.max_wpm
    } else {
        wpm
    }
}

/// Linear pot-to-pitch mapping, clamped
pub fn pitch_hz(config: &AdapterConfig, raw: u16) -> f32 {
    let span = config.max_pitch_hz - config.min_pitch_hz;
    let hz = config.min_pitch_hz + span / config.max_analog() * raw as f32;
    if hz > config.max_pitch_hz {
        config.max_pitch_hz
    } else if hz < config.min_pitch_hz {
        config.min_pitch_hz
    } else {
        hz
    }
}

/// Poll-side state for the mode switches and the two pots
#[derive(Clone, Debug)]
pub struct ModeController {
    config: AdapterConfig,
    speed: AnalogControl,
    pitch: AnalogControl,
    switches: ModeSwitches,
    timing: KeyerTiming,
    pitch_hz: f32,
}

impl ModeController {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            speed: AnalogControl::new(config.speed_delta),
            pitch: AnalogControl::new(config.pitch_delta),
            switches: ModeSwitches::default(),
            timing: config.default_timing(),
            pitch_hz: config.default_pitch_hz,
            config,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn switches(&self) -> ModeSwitches {
        self.switches
    }

    pub fn timing(&self) -> KeyerTiming {
        self.timing
    }

    pub fn wpm(&self) -> u32 {
        self.timing.wpm
    }

    pub fn pitch_hz(&self) -> f32 {
        self.pitch_hz
    }

    /// Store the latest switch levels, returning true if any changed
    pub fn update_switches(&mut self, switches: ModeSwitches) -> bool {
        if switches == self.switches {
            return false;
        }
        debug!(
            "switches automatic={} iambic={} inverted={}",
            switches.automatic, switches.iambic, switches.inverted
        );
        self.switches = switches;
        true
    }

    /// Apply a speed pot reading; returns the new timing if it was accepted
    pub fn update_speed(&mut self, raw: u16) -> Option<KeyerTiming> {
        if !self.speed.accept(raw) {
            return None;
        }
        let wpm = speed_wpm(&self.config, raw);
        self.timing = KeyerTiming::from_wpm(wpm);
        info!("speed raw={} wpm={}", raw, wpm);
        Some(self.timing)
    }

    /// Apply a pitch pot reading; returns the new pitch if it was accepted
    pub fn update_pitch(&mut self, raw: u16) -> Option<f32> {
        if !self.pitch.accept(raw) {
            return None;
        }
        self.pitch_hz = pitch_hz(&self.config, raw);
        info!("pitch raw={} hz={}", raw, self.pitch_hz);
        Some(self.pitch_hz)
    }
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new(AdapterConfig::default())
    }
}

/// Raw input levels shared between the pin-change interrupts and the poll loop
///
/// The interrupts only store levels. Which line a jack contact feeds depends
/// on the switch snapshot the poll loop publishes.
pub struct InputLines {
    pub straight: RawLine,
    pub dit: RawLine,
    pub dah: RawLine,
    pub ptt: RawLine,
    automatic: AtomicBool,
    inverted: AtomicBool,
}

impl InputLines {
    pub const fn new() -> Self {
        Self {
            straight: RawLine::new(),
            dit: RawLine::new(),
            dah: RawLine::new(),
            ptt: RawLine::new(),
            automatic: AtomicBool::new(false),
            inverted: AtomicBool::new(false),
        }
    }

    /// Make the poll loop's switch reading visible to the interrupts
    pub fn publish_switches(&self, switches: &ModeSwitches) {
        self.automatic.store(switches.automatic, Ordering::Release);
        self.inverted.store(switches.inverted, Ordering::Release);
    }

    /// Tip contact changed (interrupt context)
    pub fn on_tip_change(&self, level: bool) {
        if !self.automatic.load(Ordering::Acquire) {
            self.straight.set(level);
        } else if self.inverted.load(Ordering::Acquire) {
            self.dah.set(level);
        } else {
            self.dit.set(level);
        }
    }

    /// Ring contact changed (interrupt context). Unused by a straight key.
    pub fn on_ring_change(&self, level: bool) {
        if !self.automatic.load(Ordering::Acquire) {
            return;
        }
        if self.inverted.load(Ordering::Acquire) {
            self.dit.set(level);
        } else {
            self.dah.set(level);
        }
    }

    /// PTT line changed (interrupt context)
    pub fn on_ptt_change(&self, level: bool) {
        self.ptt.set(level);
    }
}

impl Default for InputLines {
    fn default() -> Self {
        Self::new()
    }
}
