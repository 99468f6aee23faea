//! Input debouncing for paddle, straight-key and PTT lines

use portable_atomic::{AtomicBool, Ordering};

/// Debounced view of one input line
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputState {
    /// Stable, not asserted
    Off,
    /// Stable, asserted
    On,
    /// Just released
    OffChanged,
    /// Just asserted
    OnChanged,
    /// Transition in progress, decide on a later poll
    Ignore,
}

impl InputState {
    /// Returns true for On and OnChanged
    pub const fn is_on(&self) -> bool {
        matches!(self, InputState::On | InputState::OnChanged)
    }

    /// Returns true for the two edge outcomes
    pub const fn is_changed(&self) -> bool {
        matches!(self, InputState::OnChanged | InputState::OffChanged)
    }
}

/// Pin level written from the pin-change interrupt
///
/// Inputs are active-low with pull-ups, so the idle level is high.
pub struct RawLine {
    level: AtomicBool,
}

impl RawLine {
    pub const fn new() -> Self {
        Self {
            level: AtomicBool::new(true),
        }
    }

    /// Record a new pin level (interrupt context)
    #[inline]
    pub fn set(&self, level: bool) {
        self.level.store(level, Ordering::Release);
    }

    /// Latest pin level
    #[inline]
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }
}

impl Default for RawLine {
    fn default() -> Self {
        Self::new()
    }
}

/// How long a new level must hold before it is accepted
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceWindow {
    /// Re-sample the line this many times in a row; duration depends on CPU speed
    Samples(u16),
    /// Candidate level must persist for this many timebase ticks
    Ticks(u64),
}

impl DebounceWindow {
    /// Busy-sampling filter of the reference hardware
    pub const REFERENCE_SAMPLES: DebounceWindow = DebounceWindow::Samples(100);
}

/// Poll-context debounce state for one line
#[derive(Copy, Clone, Debug)]
pub struct InputLine {
    stable: bool,
    on_level: bool,
    candidate: Option<(bool, u64)>,
}

impl InputLine {
    /// Line that idles high and is asserted when pulled low
    pub const fn active_low() -> Self {
        Self::new(true, false)
    }

    pub const fn new(idle_level: bool, on_level: bool) -> Self {
        Self {
            stable: idle_level,
            on_level,
            candidate: None,
        }
    }

    /// Last committed level
    pub fn stable_level(&self) -> bool {
        self.stable
    }

    /// Returns true if the committed level is the asserted level
    pub fn is_on(&self) -> bool {
        self.stable == self.on_level
    }

    /// Classify the current raw level against the committed one
    pub fn debounce(&mut self, raw: &RawLine, window: DebounceWindow, now: u64) -> InputState {
        let level = raw.level();
        if level == self.stable {
            self.candidate = None;
            return self.steady();
        }

        match window {
            DebounceWindow::Samples(count) => {
                for _ in 0..count {
                    if raw.level() != level {
                        return InputState::Ignore;
                    }
                }
                self.commit(level)
            }
            DebounceWindow::Ticks(ticks) => {
                let since = match self.candidate {
                    Some((candidate, since)) if candidate == level => since,
                    _ => {
                        self.candidate = Some((level, now));
                        now
                    }
                };
                if now.saturating_sub(since) >= ticks {
                    self.commit(level)
                } else {
                    InputState::Ignore
                }
            }
        }
    }

    fn steady(&self) -> InputState {
        if self.is_on() {
            InputState::On
        } else {
            InputState::Off
        }
    }

    fn commit(&mut self, level: bool) -> InputState {
        self.stable = level;
        self.candidate = None;
        if self.is_on() {
            InputState::OnChanged
        } else {
            InputState::OffChanged
        }
    }
}

impl Default for InputLine {
    fn default() -> Self {
        Self::active_low()
    }
}
