//! Element actuator
//!
//! Mirrors the scheduler's current element onto the key output and the
//! sidetone. Called every poll cycle, it only acts on edges: the key goes
//! down once when an element starts and up once when it ends.

use crate::dds::ToneControl;
use crate::hal::{Key, KeyEmitter};
use crate::scheduler::IambicScheduler;
use crate::types::KeyerAction;

/// Tracks whether the key is currently held for each element kind
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementActuator {
    dit_active: bool,
    dah_active: bool,
}

impl ElementActuator {
    pub const fn new() -> Self {
        Self { dit_active: false, dah_active: false }
    }

    pub fn dit_active(&self) -> bool {
        self.dit_active
    }

    pub fn dah_active(&self) -> bool {
        self.dah_active
    }

    /// True while either element holds the key down
    pub fn is_keyed(&self) -> bool {
        self.dit_active || self.dah_active
    }

    /// Press or release `key` so that it follows the scheduled element.
    ///
    /// Returns `Some(true)` on a press, `Some(false)` on a release and
    /// `None` when nothing changed.
    pub fn apply_if_active<E: KeyEmitter>(
        &mut self,
        scheduler: &IambicScheduler,
        key: Key,
        now: u64,
        emitter: &mut E,
        tone: &ToneControl,
    ) -> Option<bool> {
        let element = scheduler.last_element();
        let current = element.action;
        if !current.is_keyed() {
            return None;
        }

        // a previous element whose end was never observed
        let stale = current.opposite();
        let mut released = false;
        if *self.flag(stale) {
            *self.flag(stale) = false;
            emitter.release(key).ok();
            tone.set_enabled(false);
            released = true;
        }

        let active = element.is_active_at(now);
        let flag = self.flag(current);
        if active && !*flag {
            *flag = true;
            emitter.press(key).ok();
            tone.set_enabled(true);
            Some(true)
        } else if !active && *flag {
            *flag = false;
            emitter.release(key).ok();
            tone.set_enabled(false);
            Some(false)
        } else if released {
            Some(false)
        } else {
            None
        }
    }

    /// Release whatever is held, used when leaving the keyer path
    pub fn release_all<E: KeyEmitter>(&mut self, key: Key, emitter: &mut E, tone: &ToneControl) {
        if self.is_keyed() {
            self.dit_active = false;
            self.dah_active = false;
            emitter.release(key).ok();
            tone.set_enabled(false);
        }
    }

    fn flag(&mut self, action: KeyerAction) -> &mut bool {
        match action {
            KeyerAction::Dah => &mut self.dah_active,
            _ => &mut self.dit_active,
        }
    }
}
