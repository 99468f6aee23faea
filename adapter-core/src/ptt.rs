//! Push-to-talk reported as a keyboard shortcut

use crate::debounce::{DebounceWindow, InputLine, InputState, RawLine};
use crate::hal::{Key, KeyEmitter};

/// Debounced PTT line
#[derive(Clone, Debug, Default)]
pub struct PttSwitch {
    line: InputLine,
}

impl PttSwitch {
    pub const fn new() -> Self {
        Self { line: InputLine::active_low() }
    }

    pub fn is_on(&self) -> bool {
        self.line.is_on()
    }

    /// Debounce the line and emit the on/off shortcut on each edge
    pub fn service<E: KeyEmitter>(
        &mut self,
        raw: &RawLine,
        window: DebounceWindow,
        now: u64,
        emitter: &mut E,
    ) -> Result<InputState, E::Error> {
        let state = self.line.debounce(raw, window, now);
        match state {
            InputState::OnChanged => {
                info!("PTT on");
                send_shortcut(emitter, Key::PTT_ON)?;
            }
            InputState::OffChanged => {
                info!("PTT off");
                send_shortcut(emitter, Key::PTT_OFF)?;
            }
            _ => {}
        }
        Ok(state)
    }
}

fn send_shortcut<E: KeyEmitter>(emitter: &mut E, key: Key) -> Result<(), E::Error> {
    emitter.press(Key::PTT_MODIFIER)?;
    let tapped = emitter.tap(key);
    // never leave the modifier stuck
    emitter.release(Key::PTT_MODIFIER)?;
    tapped
}
