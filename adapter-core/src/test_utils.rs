//! Test utilities: a simulated bench that runs the real synthesizer and poll loop

pub mod capture {
    //! Recording of what the host and the scheduler saw

    use crate::hal::mock::KeyEvent;
    use crate::hal::{HalError, Key, KeyEmitter};
    use crate::scheduler::ScheduledElement;
    use crate::types::KeyerAction;
    use heapless::String;

    /// Elements kept by `actions` and `to_morse_string`; later ones are dropped
    pub const SEQUENCE_CAPACITY: usize = 64;

    /// Emitter that stamps every event with the tick it was sent on
    #[derive(Debug, Default)]
    pub struct TimedEmitter {
        pub now: u64,
        events: Vec<(u64, KeyEvent)>,
    }

    impl TimedEmitter {
        pub fn events(&self) -> &[(u64, KeyEvent)] {
            &self.events
        }

        pub fn clear(&mut self) {
            self.events.clear();
        }

        /// `[press, release)` tick pairs for `key`; an unreleased press ends at `u64::MAX`
        pub fn keyed_spans(&self, key: Key) -> Vec<(u64, u64)> {
            let mut spans = Vec::new();
            let mut down = None;
            for &(tick, event) in &self.events {
                match event {
                    KeyEvent::Press(k) if k == key => down = Some(tick),
                    KeyEvent::Release(k) if k == key => {
                        if let Some(start) = down.take() {
                            spans.push((start, tick));
                        }
                    }
                    _ => {}
                }
            }
            if let Some(start) = down {
                spans.push((start, u64::MAX));
            }
            spans
        }
    }

    impl KeyEmitter for TimedEmitter {
        type Error = HalError;

        fn press(&mut self, key: Key) -> Result<(), Self::Error> {
            self.events.push((self.now, KeyEvent::Press(key)));
            Ok(())
        }

        fn release(&mut self, key: Key) -> Result<(), Self::Error> {
            self.events.push((self.now, KeyEvent::Release(key)));
            Ok(())
        }
    }

    /// Every distinct element the scheduler produced, in order
    #[derive(Debug, Default, Clone)]
    pub struct OutputCapture {
        elements: Vec<ScheduledElement>,
    }

    impl OutputCapture {
        /// Record `element` unless it is the one already seen last
        pub fn observe(&mut self, element: ScheduledElement) {
            if !element.action.is_keyed() || self.elements.last() == Some(&element) {
                return;
            }
            self.elements.push(element);
        }

        pub fn elements(&self) -> &[ScheduledElement] {
            &self.elements
        }

        pub fn actions(&self) -> heapless::Vec<KeyerAction, SEQUENCE_CAPACITY> {
            self.elements.iter().map(|e| e.action).take(SEQUENCE_CAPACITY).collect()
        }

        /// Elements as `.`/`-`, with a space wherever the gap exceeds `pause_ticks`
        pub fn to_morse_string(&self, pause_ticks: u64) -> String<{ 2 * SEQUENCE_CAPACITY }> {
            let mut out = String::new();
            let mut previous_end = None;
            for element in &self.elements {
                if let Some(end) = previous_end {
                    if element.start - end > pause_ticks {
                        out.push(' ').ok();
                    }
                }
                let symbol = match element.action {
                    KeyerAction::Dah => '-',
                    _ => '.',
                };
                if out.push(symbol).is_err() {
                    break;
                }
                previous_end = Some(element.end);
            }
            out
        }

        pub fn clear(&mut self) {
            self.elements.clear();
        }
    }
}

pub mod bench {
    //! Simulated adapter: timer ticks, pin changes and poll cycles on one thread

    use super::capture::{OutputCapture, TimedEmitter};
    use crate::adapter::{AdapterShared, MorseKeyAdapter};
    use crate::controller::ModeSwitches;
    use crate::dds::Synthesizer;
    use crate::hal::mock::{MockControlPanel, MockTimer};
    use crate::hal::{HalError, HardwareTimer};
    use crate::timebase::millis_to_ticks;
    use crate::types::AdapterConfig;

    /// Poll once every this many timer ticks unless configured otherwise
    pub const DEFAULT_TICKS_PER_POLL: u32 = 8;

    fn timer_callback() {}

    pub struct SimulatedAdapter {
        shared: &'static AdapterShared,
        synth: Synthesizer<'static>,
        adapter: MorseKeyAdapter,
        timer: MockTimer,
        pub panel: MockControlPanel,
        emitter: TimedEmitter,
        capture: OutputCapture,
        ticks_per_poll: u32,
        until_poll: u32,
    }

    impl SimulatedAdapter {
        pub fn new(config: AdapterConfig, switches: ModeSwitches) -> Result<Self, HalError> {
            // one leaked record per bench, the same role a `static` plays on the target
            let shared: &'static AdapterShared = Box::leak(Box::new(AdapterShared::new()));
            let adapter = MorseKeyAdapter::new(config);
            let mut timer = MockTimer::new();
            adapter.start(&mut timer, shared, timer_callback)?;
            shared.lines.publish_switches(&switches);

            Ok(Self {
                shared,
                synth: Synthesizer::new(&shared.tone, &shared.timebase),
                adapter,
                timer,
                panel: MockControlPanel::new(switches),
                emitter: TimedEmitter::default(),
                capture: OutputCapture::default(),
                ticks_per_poll: DEFAULT_TICKS_PER_POLL,
                until_poll: 0,
            })
        }

        /// Paddle keyer in iambic mode with default settings
        pub fn keyer() -> Result<Self, HalError> {
            Self::new(
                AdapterConfig::default(),
                ModeSwitches { automatic: true, iambic: true, inverted: false },
            )
        }

        /// Straight key with default settings
        pub fn straight() -> Result<Self, HalError> {
            Self::new(AdapterConfig::default(), ModeSwitches::default())
        }

        pub fn set_ticks_per_poll(&mut self, ticks: u32) {
            self.ticks_per_poll = ticks.max(1);
        }

        pub fn set_switches(&mut self, switches: ModeSwitches) {
            self.panel.switches = switches;
        }

        /// Tip contact closed or open
        pub fn set_tip(&mut self, pressed: bool) {
            self.shared.lines.on_tip_change(!pressed);
        }

        /// Ring contact closed or open
        pub fn set_ring(&mut self, pressed: bool) {
            self.shared.lines.on_ring_change(!pressed);
        }

        /// Paddles wired tip = dit, ring = dah
        pub fn set_paddles(&mut self, dit: bool, dah: bool) {
            self.set_tip(dit);
            self.set_ring(dah);
        }

        pub fn set_straight(&mut self, pressed: bool) {
            self.set_tip(pressed);
        }

        pub fn set_ptt(&mut self, pressed: bool) {
            self.shared.lines.on_ptt_change(!pressed);
        }

        /// Run the timer for `ticks`, polling on schedule
        pub fn run_ticks(&mut self, ticks: u64) {
            for _ in 0..ticks {
                let sample = self.synth.tick();
                self.timer.set_output_level(sample);

                if self.until_poll == 0 {
                    self.poll();
                    self.until_poll = self.ticks_per_poll;
                }
                self.until_poll -= 1;
            }
        }

        pub fn run_millis(&mut self, millis: u64) {
            self.run_ticks(millis_to_ticks(millis));
        }

        fn poll(&mut self) {
            self.emitter.now = self.now();
            self.adapter.poll(self.shared, &mut self.panel, &mut self.emitter);
            self.capture.observe(self.adapter.scheduler().last_element());
        }

        pub fn now(&self) -> u64 {
            self.shared.timebase.now() as u64
        }

        pub fn shared(&self) -> &'static AdapterShared {
            self.shared
        }

        pub fn adapter(&self) -> &MorseKeyAdapter {
            &self.adapter
        }

        pub fn emitter(&self) -> &TimedEmitter {
            &self.emitter
        }

        pub fn emitter_mut(&mut self) -> &mut TimedEmitter {
            &mut self.emitter
        }

        pub fn capture(&self) -> &OutputCapture {
            &self.capture
        }

        /// Last PWM level written by the timer callback
        pub fn output_level(&self) -> u8 {
            self.timer.level
        }

        pub fn phase(&self) -> u32 {
            self.synth.phase()
        }
    }
}

pub use bench::SimulatedAdapter;
pub use capture::{OutputCapture, TimedEmitter};
