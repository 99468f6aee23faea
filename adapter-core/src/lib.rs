#![cfg_attr(not(any(feature = "std", test)), no_std)]

//! # Adapter Core
//!
//! Real-time core of a USB Morse key adapter: a DDS sidetone oscillator
//! clocked by a hardware timer, and an iambic keyer scheduler that turns
//! debounced paddle input into precisely timed key-down/key-up events on
//! the same timebase.

#[macro_use]
mod log;

pub mod types;
pub mod timebase;
pub mod dds;
pub mod debounce;
pub mod scheduler;
pub mod actuator;
pub mod controller;
pub mod ptt;
pub mod adapter;
pub mod hal;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use timebase::*;
pub use dds::*;
pub use debounce::*;
pub use scheduler::*;
pub use actuator::*;
pub use controller::*;
pub use ptt::*;
pub use adapter::*;
pub use hal::*;

/// Adapter library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration: 5-50 WPM, 300-1200 Hz, 20 WPM / 750 Hz at power-on
pub fn default_config() -> AdapterConfig {
    AdapterConfig::default()
}
