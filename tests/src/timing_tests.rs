//! Oscillator and scheduler properties, pot mapping tables, pin-backed panel

#[cfg(test)]
mod tests {
    use adapter_core::{
        pitch_hz, speed_wpm, tuning_word, AdapterConfig, AnalogChannel, AnalogSource,
        ControlPanel, HalError, IambicScheduler, KeyerAction, KeyerTiming, ModeSwitches,
        PinControlPanel, Synthesizer, Timebase, ToneControl, SINE_TABLE,
    };
    use embedded_hal_mock::eh1::pin::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
    use proptest::prelude::*;
    use rstest::rstest;

    proptest! {
        #[test]
        fn prop_phase_advance(word in any::<u32>(), ticks in 0u32..4096) {
            let tone = ToneControl::new();
            let timebase = Timebase::new();
            tone.set_tuning_word(word);
            tone.set_enabled(true);
            let mut synth = Synthesizer::new(&tone, &timebase);

            let mut sample = 0;
            for _ in 0..ticks {
                sample = synth.tick();
            }
            let expected = word.wrapping_mul(ticks);
            prop_assert_eq!(synth.phase(), expected);
            prop_assert_eq!(timebase.now(), ticks);
            if ticks > 0 {
                prop_assert_eq!(sample, SINE_TABLE[(expected >> 24) as usize]);
            }
        }

        #[test]
        fn prop_mute_keeps_phase(hz in 300.0f32..1200.0, before in 0usize..500, muted in 0usize..500, after in 1usize..500) {
            let gated_tone = ToneControl::new();
            let gated_time = Timebase::new();
            let free_tone = ToneControl::new();
            let free_time = Timebase::new();
            for tone in [&gated_tone, &free_tone] {
                tone.set_frequency(hz);
                tone.set_enabled(true);
            }
            let mut gated = Synthesizer::new(&gated_tone, &gated_time);
            let mut free = Synthesizer::new(&free_tone, &free_time);

            for _ in 0..before {
                prop_assert_eq!(gated.tick(), free.tick());
            }
            gated_tone.set_enabled(false);
            for _ in 0..muted {
                prop_assert_eq!(gated.tick(), 0);
                free.tick();
            }
            gated_tone.set_enabled(true);
            for _ in 0..after {
                prop_assert_eq!(gated.tick(), free.tick());
            }
        }

        #[test]
        fn prop_tuning_word_monotonic(a in 0.0f32..20_000.0, b in 0.0f32..20_000.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(tuning_word(low) <= tuning_word(high));
        }

        #[test]
        fn prop_scheduled_elements_never_overlap(
            steps in proptest::collection::vec((0u64..20_000, any::<bool>()), 1..40),
            wpm in 5u32..=50,
        ) {
            let timing = KeyerTiming::from_wpm(wpm);
            let mut scheduler = IambicScheduler::new(timing);
            let mut now = 0u64;
            let mut previous = None;

            for (gap, dah) in steps {
                now += gap;
                let action = if dah { KeyerAction::Dah } else { KeyerAction::Dit };
                scheduler.schedule_element(now, action, timing.duration_of(action));
                let element = scheduler.last_element();
                prop_assert_eq!(element.end - element.start, timing.duration_of(action));

                if let Some((_, prev_end)) = previous {
                    let earliest = prev_end + timing.pause_ticks;
                    prop_assert!(element.start >= earliest);
                    if now <= earliest {
                        prop_assert_eq!(element.start, earliest);
                    } else {
                        prop_assert_eq!(element.start, now);
                    }
                }
                previous = Some((element.start, element.end));
            }
        }
    }

    #[rstest]
    #[case(0, 5)]
    #[case(1, 5)]
    #[case(100, 11)]
    #[case(327, 27)]
    #[case(654, 49)]
    #[case(655, 50)]
    #[case(1023, 50)]
    fn test_speed_mapping(#[case] raw: u16, #[case] wpm: u32) {
        assert_eq!(speed_wpm(&AdapterConfig::default(), raw), wpm);
    }

    #[rstest]
    #[case(0, 300.0)]
    #[case(327, 749.5)]
    #[case(654, 1199.0)]
    #[case(655, 1200.0)]
    #[case(1023, 1200.0)]
    fn test_pitch_mapping(#[case] raw: u16, #[case] hz: f32) {
        let mapped = pitch_hz(&AdapterConfig::default(), raw);
        assert!((mapped - hz).abs() < 0.2, "raw {} -> {}", raw, mapped);
    }

    #[rstest]
    #[case(300.0, 41_065_322)]
    #[case(600.0, 82_130_644)]
    #[case(750.0, 102_663_306)]
    #[case(1200.0, 164_261_289)]
    fn test_tuning_words(#[case] hz: f32, #[case] word: u32) {
        assert_eq!(tuning_word(hz), word);
    }

    #[rstest]
    #[case(5, 7500)]
    #[case(20, 1875)]
    #[case(30, 1250)]
    #[case(50, 750)]
    fn test_dit_ticks(#[case] wpm: u32, #[case] dit: u64) {
        let timing = KeyerTiming::from_wpm(wpm);
        assert_eq!(timing.dit_ticks, dit);
        assert_eq!(timing.dah_ticks, dit * 3);
    }

    struct FixedAdc(u16, u16);

    impl AnalogSource for FixedAdc {
        type Error = HalError;

        fn read(&mut self, channel: AnalogChannel) -> Result<u16, Self::Error> {
            Ok(match channel {
                AnalogChannel::Speed => self.0,
                AnalogChannel::Pitch => self.1,
            })
        }
    }

    #[test]
    fn test_pin_control_panel_with_mock_pins() {
        let automatic = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::Low),
        ]);
        let iambic = PinMock::new(&[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
        ]);
        let inverted = PinMock::new(&[
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
        ]);
        let mut panel = PinControlPanel::new(automatic, iambic, inverted, FixedAdc(20, 600));

        assert_eq!(
            panel.mode_switches().unwrap(),
            ModeSwitches { automatic: true, iambic: true, inverted: false }
        );
        assert_eq!(
            panel.mode_switches().unwrap(),
            ModeSwitches { automatic: false, iambic: true, inverted: true }
        );
        assert_eq!(panel.read_speed().unwrap(), 20);
        assert_eq!(panel.read_pitch().unwrap(), 600);

        let (mut automatic, mut iambic, mut inverted, _) = panel.release();
        automatic.done();
        iambic.done();
        inverted.done();
    }
}
