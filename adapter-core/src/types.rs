//! Core data types for the adapter

use crate::debounce::DebounceWindow;
use crate::timebase::millis_to_ticks;

/// Keyer element currently tracked by the scheduler
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyerAction {
    /// Nothing scheduled since power-on
    #[default]
    None,
    /// Dit (short element)
    Dit,
    /// Dah (long element)
    Dah,
}

impl KeyerAction {
    /// Returns true for Dit and Dah
    pub const fn is_keyed(&self) -> bool {
        match self {
            KeyerAction::None => false,
            KeyerAction::Dit | KeyerAction::Dah => true,
        }
    }

    /// Returns the opposite element (Dit <-> Dah), None unchanged
    pub const fn opposite(&self) -> KeyerAction {
        match self {
            KeyerAction::Dit => KeyerAction::Dah,
            KeyerAction::Dah => KeyerAction::Dit,
            KeyerAction::None => KeyerAction::None,
        }
    }
}

/// Element durations in timebase ticks, derived from a words-per-minute speed
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyerTiming {
    /// Speed these durations were derived from
    pub wpm: u32,
    /// Dit duration (one unit)
    pub dit_ticks: u64,
    /// Dah duration, always 3 * dit
    pub dah_ticks: u64,
    /// Inter-element pause, always one dit
    pub pause_ticks: u64,
    /// Look-ahead tolerance for queueing the next element, a tenth of a unit
    pub ahead_ticks: u64,
}

impl KeyerTiming {
    /// Ticks in one unit at 1 WPM (PARIS: 50 units per word, 1200 ms per unit)
    const UNIT_TICKS_AT_ONE_WPM: u64 = millis_to_ticks(1200);

    /// Derive all durations from `wpm`. Zero is treated as 1 WPM.
    pub const fn from_wpm(wpm: u32) -> Self {
        let wpm = if wpm == 0 { 1 } else { wpm };
        let dit_ticks = Self::UNIT_TICKS_AT_ONE_WPM / wpm as u64;
        Self {
            wpm,
            dit_ticks,
            dah_ticks: dit_ticks * 3,
            pause_ticks: dit_ticks,
            ahead_ticks: Self::UNIT_TICKS_AT_ONE_WPM / 10 / wpm as u64,
        }
    }

    /// Duration of a keyed action, zero for `KeyerAction::None`
    pub const fn duration_of(&self, action: KeyerAction) -> u64 {
        match action {
            KeyerAction::Dit => self.dit_ticks,
            KeyerAction::Dah => self.dah_ticks,
            KeyerAction::None => 0,
        }
    }
}

impl Default for KeyerTiming {
    fn default() -> Self {
        Self::from_wpm(AdapterConfig::DEFAULT_WPM)
    }
}

/// Adapter configuration: control ranges, defaults and input filtering
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdapterConfig {
    /// Slowest speed selectable with the speed pot
    pub min_wpm: u32,
    /// Fastest speed selectable with the speed pot
    pub max_wpm: u32,
    /// Speed used until the pot is first moved
    pub default_wpm: u32,
    /// Lowest sidetone pitch
    pub min_pitch_hz: f32,
    /// Highest sidetone pitch
    pub max_pitch_hz: f32,
    /// Pitch used until the pot is first moved
    pub default_pitch_hz: f32,
    /// Raw ADC full-scale reading
    pub analog_full_scale: u16,
    /// Pot supply voltage over ADC reference voltage (3.20 V / 5.00 V)
    pub analog_reference_ratio: f32,
    /// Speed readings within this many ADC units of the last one are ignored
    pub speed_delta: u16,
    /// Pitch readings within this many ADC units of the last one are ignored
    pub pitch_delta: u16,
    /// Debounce window in milliseconds
    pub debounce_ms: u32,
    /// Mirror paddles as plain '.' / '/' keys with no scheduling or sidetone
    pub pass_through: bool,
}

impl AdapterConfig {
    pub const DEFAULT_WPM: u32 = 20;
    pub const DEFAULT_PITCH_HZ: f32 = 750.0;

    /// Create a new configuration with validation
    pub fn new(
        min_wpm: u32,
        max_wpm: u32,
        min_pitch_hz: f32,
        max_pitch_hz: f32,
        debounce_ms: u32,
        pass_through: bool,
    ) -> Result<Self, &'static str> {
        let config = Self {
            min_wpm,
            max_wpm,
            default_wpm: if Self::DEFAULT_WPM < min_wpm {
                min_wpm
            } else if Self::DEFAULT_WPM > max_wpm {
                max_wpm
            } else {
                Self::DEFAULT_WPM
            },
            min_pitch_hz,
            max_pitch_hz,
            default_pitch_hz: if Self::DEFAULT_PITCH_HZ < min_pitch_hz {
                min_pitch_hz
            } else if Self::DEFAULT_PITCH_HZ > max_pitch_hz {
                max_pitch_hz
            } else {
                Self::DEFAULT_PITCH_HZ
            },
            debounce_ms,
            pass_through,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check bounds and defaults for consistency
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.min_wpm == 0 || self.min_wpm >= self.max_wpm {
            return Err("WPM range must be non-empty and start above zero");
        }
        if self.max_wpm > 100 {
            return Err("WPM must be <= 100");
        }
        if !(self.min_pitch_hz > 0.0 && self.min_pitch_hz < self.max_pitch_hz) {
            return Err("Pitch range must be non-empty and positive");
        }
        if self.default_wpm < self.min_wpm || self.default_wpm > self.max_wpm {
            return Err("Default WPM outside range");
        }
        if self.default_pitch_hz < self.min_pitch_hz || self.default_pitch_hz > self.max_pitch_hz {
            return Err("Default pitch outside range");
        }
        if self.analog_full_scale == 0 || !(self.analog_reference_ratio > 0.0) {
            return Err("Analog full scale must be positive");
        }
        if self.debounce_ms > 100 {
            return Err("Debounce must be <= 100ms");
        }
        Ok(())
    }

    /// Highest raw reading the pots can actually produce
    pub fn max_analog(&self) -> f32 {
        self.analog_full_scale as f32 * self.analog_reference_ratio
    }

    /// Debounce window on the shared timebase
    pub fn debounce_window(&self) -> DebounceWindow {
        DebounceWindow::Ticks(millis_to_ticks(self.debounce_ms as u64))
    }

    /// Timing for the power-on speed
    pub fn default_timing(&self) -> KeyerTiming {
        KeyerTiming::from_wpm(self.default_wpm)
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            min_wpm: 5,
            max_wpm: 50,
            default_wpm: Self::DEFAULT_WPM,
            min_pitch_hz: 300.0,
            max_pitch_hz: 1200.0,
            default_pitch_hz: Self::DEFAULT_PITCH_HZ,
            analog_full_scale: 1023,
            analog_reference_ratio: 3.20 / 5.00,
            speed_delta: 1,
            pitch_delta: 1,
            debounce_ms: 5,
            pass_through: false,
        }
    }
}
