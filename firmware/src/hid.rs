//! USB HID keyboard output
//!
//! The poll loop builds boot-protocol keyboard reports and queues them for
//! [`UsbKeyboard`](crate::UsbKeyboard), which pushes one report per IN transfer.

use heapless::spsc::Producer;
use usbd_hid::descriptor::KeyboardReport;

use adapter_core::{HalError, Key, KeyEmitter};

/// HID modifier bit for Left Alt
pub const MODIFIER_LEFT_ALT: u8 = 0x04;

/// HID usage ID for a printable key, if the keyboard page has one
pub const fn hid_usage(key: u8) -> Option<u8> {
    match key {
        b'a'..=b'z' => Some(0x04 + (key - b'a')),
        b'1'..=b'9' => Some(0x1E + (key - b'1')),
        b'0' => Some(0x27),
        b' ' => Some(0x2C),
        b',' => Some(0x36),
        b'.' => Some(0x37),
        b'/' => Some(0x38),
        _ => None,
    }
}

/// Keyboard state mirrored into reports; every change queues one report
pub struct HidKeyEmitter<'a, const N: usize> {
    reports: Producer<'a, KeyboardReport, N>,
    modifier: u8,
    keycodes: [u8; 6],
}

impl<'a, const N: usize> HidKeyEmitter<'a, N> {
    pub fn new(reports: Producer<'a, KeyboardReport, N>) -> Self {
        Self {
            reports,
            modifier: 0,
            keycodes: [0; 6],
        }
    }

    /// Report describing the keys currently held
    pub fn report(&self) -> KeyboardReport {
        KeyboardReport {
            modifier: self.modifier,
            reserved: 0,
            leds: 0,
            keycodes: self.keycodes,
        }
    }

    fn push(&mut self) -> Result<(), HalError> {
        let report = self.report();
        self.reports.enqueue(report).map_err(|_| HalError::UsbError)
    }
}

impl<'a, const N: usize> KeyEmitter for HidKeyEmitter<'a, N> {
    type Error = HalError;

    fn press(&mut self, key: Key) -> Result<(), Self::Error> {
        match key {
            Key::LeftAlt => self.modifier |= MODIFIER_LEFT_ALT,
            Key::Char(c) => {
                let usage = hid_usage(c).ok_or(HalError::InvalidConfig)?;
                if !self.keycodes.contains(&usage) {
                    let slot = self
                        .keycodes
                        .iter_mut()
                        .find(|code| **code == 0)
                        .ok_or(HalError::UsbError)?;
                    *slot = usage;
                }
            }
        }
        self.push()
    }

    fn release(&mut self, key: Key) -> Result<(), Self::Error> {
        match key {
            Key::LeftAlt => self.modifier &= !MODIFIER_LEFT_ALT,
            Key::Char(c) => {
                let usage = hid_usage(c).ok_or(HalError::InvalidConfig)?;
                for code in self.keycodes.iter_mut().filter(|code| **code == usage) {
                    *code = 0;
                }
            }
        }
        self.push()
    }
}
