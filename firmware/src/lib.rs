#![cfg_attr(not(test), no_std)]

//! CH32V203 board support for the Morse key adapter
//!
//! Register drivers that implement the `adapter-core` HAL traits, and the
//! USB HID keyboard emitter and device.

pub mod ch32v203_hardware;
pub mod hid;
pub mod usb;

pub use ch32v203_hardware::{Adc1, GpioInput, Tim1Pwm};
pub use hid::{hid_usage, HidKeyEmitter};
pub use usb::UsbKeyboard;
