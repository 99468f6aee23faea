//! Iambic keyer scheduler
//!
//! Converts debounced paddle states into a single scheduled element with
//! exact start and end ticks. Only the most recently scheduled element is
//! kept; consecutive elements are chained with exactly one pause between
//! them, and a look-ahead tolerance lets the next element be queued just
//! before the current one finishes so polling latency never opens a gap.

use crate::debounce::InputState;
use crate::types::{KeyerAction, KeyerTiming};

/// The one element the scheduler is tracking
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduledElement {
    pub action: KeyerAction,
    pub start: u64,
    pub end: u64,
}

impl ScheduledElement {
    /// Returns true while `now` lies in `[start, end)` of a keyed element
    pub const fn is_active_at(&self, now: u64) -> bool {
        self.action.is_keyed() && now >= self.start && now < self.end
    }

    /// Element length in ticks
    pub const fn duration(&self) -> u64 {
        self.end - self.start
    }
}

/// Iambic scheduler state: last element, pending flags, current timing
#[derive(Clone, Debug)]
pub struct IambicScheduler {
    last: ScheduledElement,
    timing: KeyerTiming,
    dit_pending: bool,
    dah_pending: bool,
}

impl IambicScheduler {
    pub fn new(timing: KeyerTiming) -> Self {
        Self {
            last: ScheduledElement::default(),
            timing,
            dit_pending: false,
            dah_pending: false,
        }
    }

    /// Most recently scheduled element
    pub fn last_element(&self) -> ScheduledElement {
        self.last
    }

    pub fn timing(&self) -> &KeyerTiming {
        &self.timing
    }

    /// Replace the timing. The element already scheduled keeps its end tick.
    pub fn set_timing(&mut self, timing: KeyerTiming) {
        self.timing = timing;
    }

    pub fn dit_pending(&self) -> bool {
        self.dit_pending
    }

    pub fn dah_pending(&self) -> bool {
        self.dah_pending
    }

    /// True when the last element (plus its pause) ends within the look-ahead window
    pub fn can_schedule_at(&self, now: u64) -> bool {
        self.last.end + self.timing.pause_ticks < now + self.timing.ahead_ticks
    }

    /// True while the last scheduled element should be keyed
    pub fn is_active_at(&self, now: u64) -> bool {
        self.last.is_active_at(now)
    }

    /// Schedule `action` for `duration` ticks.
    ///
    /// Starts at `now` after an idle gap longer than one pause, otherwise
    /// exactly one pause after the previous element ends.
    pub fn schedule_element(&mut self, now: u64, action: KeyerAction, duration: u64) {
        let earliest = self.last.end + self.timing.pause_ticks;
        let start = if now > earliest { now } else { earliest };

        self.last = ScheduledElement {
            action,
            start,
            end: start + duration,
        };

        trace!("schedule {} now={} start={} end={}", action, now, start, start + duration);
    }

    /// Run one poll cycle for both paddles.
    ///
    /// After a Dit, iambic mode looks at Dah first (forcing alternation)
    /// and non-iambic mode at Dit first (favouring repetition). After a Dah
    /// or nothing, the orders flip.
    pub fn evaluate(&mut self, dit: InputState, dah: InputState, now: u64, iambic: bool) {
        let order = match (self.last.action, iambic) {
            (KeyerAction::Dit, true) => [KeyerAction::Dah, KeyerAction::Dit],
            (KeyerAction::Dit, false) => [KeyerAction::Dit, KeyerAction::Dah],
            (_, true) => [KeyerAction::Dit, KeyerAction::Dah],
            (_, false) => [KeyerAction::Dah, KeyerAction::Dit],
        };

        for action in order {
            let state = match action {
                KeyerAction::Dah => dah,
                _ => dit,
            };
            self.handle_action_change(action, state, now);
        }
    }

    /// Apply one paddle's debounced state
    pub fn handle_action_change(&mut self, action: KeyerAction, state: InputState, now: u64) {
        let schedulable = self.can_schedule_at(now);
        let other_pending = self.is_pending(action.opposite());
        let duration = self.timing.duration_of(action);

        match state {
            InputState::OnChanged => {
                if schedulable {
                    self.schedule_element(now, action, duration);
                } else if self.last.action != action && !other_pending {
                    // first pending flag set wins; the other paddle waits its turn
                    self.set_pending(action, true);
                }
            }
            InputState::On => {
                if schedulable && !other_pending {
                    self.set_pending(action, false);
                    self.schedule_element(now, action, duration);
                }
            }
            InputState::Off | InputState::OffChanged => {
                if self.is_pending(action) && schedulable && !other_pending {
                    self.set_pending(action, false);
                    self.schedule_element(now, action, duration);
                }
            }
            InputState::Ignore => {}
        }
    }

    fn is_pending(&self, action: KeyerAction) -> bool {
        match action {
            KeyerAction::Dit => self.dit_pending,
            KeyerAction::Dah => self.dah_pending,
            KeyerAction::None => false,
        }
    }

    fn set_pending(&mut self, action: KeyerAction, pending: bool) {
        match action {
            KeyerAction::Dit => self.dit_pending = pending,
            KeyerAction::Dah => self.dah_pending = pending,
            KeyerAction::None => {}
        }
    }
}

impl Default for IambicScheduler {
    fn default() -> Self {
        Self::new(KeyerTiming::default())
    }
}
