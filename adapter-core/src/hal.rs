//! Hardware Abstraction Layer for the adapter
//!
//! The core never touches registers. A platform supplies a periodic
//! [`HardwareTimer`] for the synthesizer, a [`ControlPanel`] for the mode
//! switches and pots, and a [`KeyEmitter`] that turns key presses into
//! whatever the host understands (USB HID on the real board).

use embedded_hal::digital::InputPin;
use crate::controller::ModeSwitches;

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Analog conversion failed
    AdcError,
    /// Timer configuration failed
    TimerError,
    /// Host link rejected or dropped a report
    UsbError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::AdcError => write!(f, "Analog conversion failed"),
            HalError::TimerError => write!(f, "Timer configuration failed"),
            HalError::UsbError => write!(f, "USB report failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// A key the adapter can report to the host
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Hash))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    /// Printable key identified by its ASCII code
    Char(u8),
    /// Left Alt modifier
    LeftAlt,
}

impl Key {
    /// Straight key and keyer output
    pub const STRAIGHT: Key = Key::Char(b',');
    /// Dit paddle in pass-through mode
    pub const PASS_THROUGH_DIT: Key = Key::Char(b'.');
    /// Dah paddle in pass-through mode
    pub const PASS_THROUGH_DAH: Key = Key::Char(b'/');
    /// Tapped with the modifier held when PTT goes on
    pub const PTT_ON: Key = Key::Char(b'i');
    /// Tapped with the modifier held when PTT goes off
    pub const PTT_OFF: Key = Key::Char(b'o');
    /// Modifier held around the PTT keys
    pub const PTT_MODIFIER: Key = Key::LeftAlt;
}

/// Trait for key event output towards the host
pub trait KeyEmitter {
    type Error: From<HalError>;

    /// Report `key` as held down
    fn press(&mut self, key: Key) -> Result<(), Self::Error>;

    /// Report `key` as released
    fn release(&mut self, key: Key) -> Result<(), Self::Error>;

    /// Press and immediately release
    fn tap(&mut self, key: Key) -> Result<(), Self::Error> {
        self.press(key)?;
        self.release(key)
    }
}

/// The two pots on the front panel
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogChannel {
    Speed,
    Pitch,
}

/// A single ADC shared between the analog channels
pub trait AnalogSource {
    type Error: From<HalError>;

    /// One conversion, `0..=analog_full_scale`
    fn read(&mut self, channel: AnalogChannel) -> Result<u16, Self::Error>;
}

/// Mode switches and pots, read from the poll loop
pub trait ControlPanel {
    type Error: From<HalError>;

    /// Current switch levels, undebounced
    fn mode_switches(&mut self) -> Result<ModeSwitches, Self::Error>;

    /// Raw speed pot reading
    fn read_speed(&mut self) -> Result<u16, Self::Error>;

    /// Raw pitch pot reading
    fn read_pitch(&mut self) -> Result<u16, Self::Error>;
}

/// Control panel built from three embedded-hal switch pins and an ADC
pub struct PinControlPanel<A, I, V, S> {
    automatic: A,
    iambic: I,
    inverted: V,
    adc: S,
}

impl<A, I, V, S> PinControlPanel<A, I, V, S>
where
    A: InputPin,
    I: InputPin,
    V: InputPin,
    S: AnalogSource,
{
    pub fn new(automatic: A, iambic: I, inverted: V, adc: S) -> Self {
        Self { automatic, iambic, inverted, adc }
    }

    /// Give the pins and ADC back
    pub fn release(self) -> (A, I, V, S) {
        (self.automatic, self.iambic, self.inverted, self.adc)
    }
}

impl<A, I, V, S> ControlPanel for PinControlPanel<A, I, V, S>
where
    A: InputPin,
    I: InputPin,
    V: InputPin,
    S: AnalogSource,
{
    type Error = S::Error;

    fn mode_switches(&mut self) -> Result<ModeSwitches, Self::Error> {
        // A switch is set when its line reads high
        Ok(ModeSwitches {
            automatic: self.automatic.is_high().map_err(|_| HalError::GpioError)?,
            iambic: self.iambic.is_high().map_err(|_| HalError::GpioError)?,
            inverted: self.inverted.is_high().map_err(|_| HalError::GpioError)?,
        })
    }

    fn read_speed(&mut self) -> Result<u16, Self::Error> {
        self.adc.read(AnalogChannel::Speed)
    }

    fn read_pitch(&mut self) -> Result<u16, Self::Error> {
        self.adc.read(AnalogChannel::Pitch)
    }
}

/// Counting mode of the tone timer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerMode {
    /// Up/down counting, one update per full period (8-bit: clock / 510)
    PhaseCorrectPwm,
    /// Up counting only (8-bit: clock / 256)
    FastPwm,
}

/// Periodic timer that drives the synthesizer and carries its PWM output
pub trait HardwareTimer {
    type Error: From<HalError>;

    /// Set the clock prescaler and counting mode
    fn configure(&mut self, prescaler: u16, mode: TimerMode) -> Result<(), Self::Error>;

    /// Register the per-tick callback and enable the update interrupt
    fn on_tick(&mut self, callback: fn()) -> Result<(), Self::Error>;

    /// Write the PWM compare value. Called from the tick callback.
    fn set_output_level(&mut self, level: u8);
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use std::vec::Vec;

    /// Recorded emitter event
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum KeyEvent {
        Press(Key),
        Release(Key),
    }

    /// Emitter that records every event in order
    #[derive(Default, Debug)]
    pub struct MockKeyEmitter {
        events: Vec<KeyEvent>,
        /// When set, every call fails with `HalError::UsbError`
        pub fail: bool,
    }

    impl MockKeyEmitter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> &[KeyEvent] {
            &self.events
        }

        /// Drain the recorded events
        pub fn take(&mut self) -> Vec<KeyEvent> {
            core::mem::take(&mut self.events)
        }

        /// Whether `key` is currently held according to the recorded events
        pub fn is_held(&self, key: Key) -> bool {
            self.events.iter().rev().find_map(|event| match *event {
                KeyEvent::Press(k) if k == key => Some(true),
                KeyEvent::Release(k) if k == key => Some(false),
                _ => None,
            }).unwrap_or(false)
        }

        pub fn press_count(&self, key: Key) -> usize {
            self.events.iter().filter(|e| **e == KeyEvent::Press(key)).count()
        }
    }

    impl KeyEmitter for MockKeyEmitter {
        type Error = HalError;

        fn press(&mut self, key: Key) -> Result<(), Self::Error> {
            if self.fail {
                return Err(HalError::UsbError);
            }
            self.events.push(KeyEvent::Press(key));
            Ok(())
        }

        fn release(&mut self, key: Key) -> Result<(), Self::Error> {
            if self.fail {
                return Err(HalError::UsbError);
            }
            self.events.push(KeyEvent::Release(key));
            Ok(())
        }
    }

    /// Control panel with directly settable values
    #[derive(Default, Debug)]
    pub struct MockControlPanel {
        pub switches: ModeSwitches,
        pub speed: u16,
        pub pitch: u16,
        /// When set, every read fails with `HalError::AdcError`
        pub fail: bool,
        /// Number of analog conversions performed
        pub analog_reads: usize,
    }

    impl MockControlPanel {
        pub fn new(switches: ModeSwitches) -> Self {
            Self { switches, ..Self::default() }
        }
    }

    impl ControlPanel for MockControlPanel {
        type Error = HalError;

        fn mode_switches(&mut self) -> Result<ModeSwitches, Self::Error> {
            if self.fail {
                return Err(HalError::GpioError);
            }
            Ok(self.switches)
        }

        fn read_speed(&mut self) -> Result<u16, Self::Error> {
            if self.fail {
                return Err(HalError::AdcError);
            }
            self.analog_reads += 1;
            Ok(self.speed)
        }

        fn read_pitch(&mut self) -> Result<u16, Self::Error> {
            if self.fail {
                return Err(HalError::AdcError);
            }
            self.analog_reads += 1;
            Ok(self.pitch)
        }
    }

    /// Timer that stores its configuration and fires on demand
    #[derive(Default, Debug)]
    pub struct MockTimer {
        pub prescaler: Option<u16>,
        pub mode: Option<TimerMode>,
        pub level: u8,
        callback: Option<fn()>,
    }

    impl MockTimer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_running(&self) -> bool {
            self.callback.is_some()
        }

        /// Invoke the registered callback once
        pub fn fire(&self) -> Result<(), HalError> {
            let callback = self.callback.ok_or(HalError::NotInitialized)?;
            callback();
            Ok(())
        }
    }

    impl HardwareTimer for MockTimer {
        type Error = HalError;

        fn configure(&mut self, prescaler: u16, mode: TimerMode) -> Result<(), Self::Error> {
            if prescaler == 0 {
                return Err(HalError::InvalidConfig);
            }
            self.prescaler = Some(prescaler);
            self.mode = Some(mode);
            Ok(())
        }

        fn on_tick(&mut self, callback: fn()) -> Result<(), Self::Error> {
            if self.mode.is_none() {
                return Err(HalError::NotInitialized);
            }
            self.callback = Some(callback);
            Ok(())
        }

        fn set_output_level(&mut self, level: u8) {
            self.level = level;
        }
    }
}
