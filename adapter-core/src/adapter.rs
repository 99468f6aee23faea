//! Poll loop tying inputs, scheduler and sidetone together

use crate::actuator::ElementActuator;
use crate::controller::{InputLines, ModeController};
use crate::dds::ToneControl;
use crate::debounce::{DebounceWindow, InputLine, InputState, RawLine};
use crate::hal::{ControlPanel, HardwareTimer, Key, KeyEmitter, TimerMode};
use crate::ptt::PttSwitch;
use crate::scheduler::IambicScheduler;
use crate::timebase::{TickClock, Timebase};
use crate::types::AdapterConfig;

/// State shared between the timer/pin-change interrupts and the poll loop
///
/// Lives in a `static` on the target. Every field is written by exactly
/// one context.
pub struct AdapterShared {
    pub lines: InputLines,
    pub tone: ToneControl,
    pub timebase: Timebase,
}

impl AdapterShared {
    pub const fn new() -> Self {
        Self {
            lines: InputLines::new(),
            tone: ToneControl::new(),
            timebase: Timebase::new(),
        }
    }
}

impl Default for AdapterShared {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything owned by the poll loop
#[derive(Clone, Debug)]
pub struct MorseKeyAdapter {
    controller: ModeController,
    scheduler: IambicScheduler,
    actuator: ElementActuator,
    straight: InputLine,
    dit: InputLine,
    dah: InputLine,
    ptt: PttSwitch,
    clock: TickClock,
    window: DebounceWindow,
}

impl MorseKeyAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            scheduler: IambicScheduler::new(config.default_timing()),
            window: config.debounce_window(),
            controller: ModeController::new(config),
            actuator: ElementActuator::new(),
            straight: InputLine::active_low(),
            dit: InputLine::active_low(),
            dah: InputLine::active_low(),
            ptt: PttSwitch::new(),
            clock: TickClock::new(),
        }
    }

    /// Use a different debounce filter, e.g. `DebounceWindow::REFERENCE_SAMPLES`
    pub fn with_debounce_window(mut self, window: DebounceWindow) -> Self {
        self.window = window;
        self
    }

    /// Load the power-on pitch and start the tone timer
    pub fn start<T: HardwareTimer>(
        &self,
        timer: &mut T,
        shared: &AdapterShared,
        on_tick: fn(),
    ) -> Result<(), T::Error> {
        shared.tone.set_enabled(false);
        shared.tone.set_frequency(self.controller.pitch_hz());
        timer.configure(1, TimerMode::PhaseCorrectPwm)?;
        timer.on_tick(on_tick)?;
        info!(
            "adapter started: {} WPM, {} Hz",
            self.controller.wpm(),
            self.controller.pitch_hz()
        );
        Ok(())
    }

    /// One iteration of the cooperative loop
    pub fn poll<P, E>(&mut self, shared: &AdapterShared, panel: &mut P, emitter: &mut E)
    where
        P: ControlPanel,
        E: KeyEmitter,
    {
        match panel.mode_switches() {
            Ok(switches) => {
                let was_automatic = self.controller.switches().automatic;
                if self.controller.update_switches(switches) && switches.automatic != was_automatic {
                    self.leave_mode(was_automatic, shared, emitter);
                }
            }
            Err(_) => warn!("mode switch read failed"),
        }
        let switches = self.controller.switches();
        shared.lines.publish_switches(&switches);

        // the sounding tone loads the analog reference
        if !shared.tone.is_enabled() {
            self.read_controls(shared, panel);
        }

        let now = self.clock.now(&shared.timebase);

        if self.ptt.service(&shared.lines.ptt, self.window, now, emitter).is_err() {
            warn!("PTT report failed");
        }

        let pass_through = self.controller.config().pass_through;
        match (pass_through, switches.automatic) {
            (true, true) => {
                mirror_line(&mut self.dit, &shared.lines.dit, self.window, now, Key::PASS_THROUGH_DIT, emitter, None);
                mirror_line(&mut self.dah, &shared.lines.dah, self.window, now, Key::PASS_THROUGH_DAH, emitter, None);
            }
            (true, false) => {
                mirror_line(&mut self.straight, &shared.lines.straight, self.window, now, Key::STRAIGHT, emitter, None);
            }
            (false, true) => {
                let dit = self.dit.debounce(&shared.lines.dit, self.window, now);
                let dah = self.dah.debounce(&shared.lines.dah, self.window, now);
                self.scheduler.evaluate(dit, dah, now, switches.iambic);
                self.actuator
                    .apply_if_active(&self.scheduler, Key::STRAIGHT, now, emitter, &shared.tone);
            }
            (false, false) => {
                mirror_line(
                    &mut self.straight,
                    &shared.lines.straight,
                    self.window,
                    now,
                    Key::STRAIGHT,
                    emitter,
                    Some(&shared.tone),
                );
            }
        }
    }

    /// Release whatever the mode being left still holds and forget its line state
    fn leave_mode<E: KeyEmitter>(&mut self, was_automatic: bool, shared: &AdapterShared, emitter: &mut E) {
        let pass_through = self.controller.config().pass_through;
        if was_automatic {
            self.actuator.release_all(Key::STRAIGHT, emitter, &shared.tone);
            if pass_through {
                release_line(&mut self.dit, Key::PASS_THROUGH_DIT, emitter);
                release_line(&mut self.dah, Key::PASS_THROUGH_DAH, emitter);
            }
        } else {
            if self.straight.is_on() && !pass_through {
                shared.tone.set_enabled(false);
            }
            release_line(&mut self.straight, Key::STRAIGHT, emitter);
        }
    }

    fn read_controls<P: ControlPanel>(&mut self, shared: &AdapterShared, panel: &mut P) {
        match panel.read_speed() {
            Ok(raw) => {
                if let Some(timing) = self.controller.update_speed(raw) {
                    self.scheduler.set_timing(timing);
                }
            }
            Err(_) => warn!("speed read failed"),
        }
        match panel.read_pitch() {
            Ok(raw) => {
                if let Some(hz) = self.controller.update_pitch(raw) {
                    shared.tone.set_frequency(hz);
                }
            }
            Err(_) => warn!("pitch read failed"),
        }
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn scheduler(&self) -> &IambicScheduler {
        &self.scheduler
    }

    pub fn actuator(&self) -> &ElementActuator {
        &self.actuator
    }

    pub fn ptt(&self) -> &PttSwitch {
        &self.ptt
    }

    pub fn debounce_window(&self) -> DebounceWindow {
        self.window
    }
}

impl Default for MorseKeyAdapter {
    fn default() -> Self {
        Self::new(AdapterConfig::default())
    }
}

/// Release `key` if `line` had it pressed, then reset the line to idle
fn release_line<E: KeyEmitter>(line: &mut InputLine, key: Key, emitter: &mut E) {
    if line.is_on() {
        emitter.release(key).ok();
    }
    *line = InputLine::active_low();
}

/// Mirror a debounced line onto a key, optionally gating the sidetone too
fn mirror_line<E: KeyEmitter>(
    line: &mut InputLine,
    raw: &RawLine,
    window: DebounceWindow,
    now: u64,
    key: Key,
    emitter: &mut E,
    tone: Option<&ToneControl>,
) {
    let on = match line.debounce(raw, window, now) {
        InputState::OnChanged => true,
        InputState::OffChanged => false,
        _ => return,
    };
    if on {
        emitter.press(key).ok();
    } else {
        emitter.release(key).ok();
    }
    if let Some(tone) = tone {
        tone.set_enabled(on);
    }
}
