//! Straight key, pass-through, wiring, PTT and front panel behaviour

#[cfg(test)]
mod tests {
    use adapter_core::hal::mock::KeyEvent;
    use adapter_core::test_utils::SimulatedAdapter;
    use adapter_core::{tuning_word, AdapterConfig, Key, KeyerAction, ModeSwitches};

    const KEYER: ModeSwitches = ModeSwitches { automatic: true, iambic: true, inverted: false };

    fn settle(sim: &mut SimulatedAdapter) {
        sim.run_millis(100);
    }

    fn keys(sim: &SimulatedAdapter) -> Vec<KeyEvent> {
        sim.emitter().events().iter().map(|(_, e)| *e).collect()
    }

    #[test]
    fn test_straight_key_press_and_release() {
        println!("\n=== Straight key ===");
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);

        sim.set_straight(true);
        sim.run_millis(50);
        assert_eq!(keys(&sim), vec![KeyEvent::Press(Key::STRAIGHT)]);
        assert!(sim.shared().tone.is_enabled());

        sim.set_straight(false);
        sim.run_millis(50);
        assert_eq!(
            keys(&sim),
            vec![KeyEvent::Press(Key::STRAIGHT), KeyEvent::Release(Key::STRAIGHT)]
        );
        assert!(!sim.shared().tone.is_enabled());
        assert_eq!(sim.output_level(), 0);
    }

    #[test]
    fn test_straight_key_timing_follows_contact() {
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);

        sim.set_straight(true);
        let down = sim.now();
        sim.run_millis(300);
        sim.set_straight(false);
        let up = sim.now();
        sim.run_millis(50);

        let spans = sim.emitter().keyed_spans(Key::STRAIGHT);
        assert_eq!(spans.len(), 1);
        // both edges delayed by the same debounce window
        let held = spans[0].1 - spans[0].0;
        assert!(held.abs_diff(up - down) <= 8);
    }

    #[test]
    fn test_straight_key_ignores_ring() {
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);
        sim.set_ring(true);
        sim.run_millis(100);
        assert!(keys(&sim).is_empty());
    }

    #[test]
    fn test_contact_bounce_is_filtered() {
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);

        // chatter every 2 ms, shorter than the 5 ms window
        for i in 0..20 {
            sim.set_straight(i % 2 == 0);
            sim.run_millis(2);
        }
        sim.set_straight(false);
        sim.run_millis(20);
        assert!(keys(&sim).is_empty());
        assert!(!sim.shared().tone.is_enabled());
    }

    #[test]
    fn test_inverted_wiring_swaps_paddles() {
        let mut sim = SimulatedAdapter::new(
            AdapterConfig::default(),
            ModeSwitches { inverted: true, ..KEYER },
        )
        .unwrap();
        settle(&mut sim);

        sim.set_tip(true);
        sim.run_millis(100);
        sim.set_tip(false);
        sim.run_millis(300);
        assert_eq!(sim.capture().actions()[0], KeyerAction::Dah);
    }

    #[test]
    fn test_pass_through_mirrors_paddles() {
        println!("\n=== Pass-through ===");
        let config = AdapterConfig { pass_through: true, ..AdapterConfig::default() };
        let mut sim = SimulatedAdapter::new(config, KEYER).unwrap();
        settle(&mut sim);

        sim.set_paddles(true, false);
        sim.run_millis(20);
        sim.set_paddles(true, true);
        sim.run_millis(20);
        sim.set_paddles(false, false);
        sim.run_millis(20);

        assert_eq!(
            keys(&sim),
            vec![
                KeyEvent::Press(Key::PASS_THROUGH_DIT),
                KeyEvent::Press(Key::PASS_THROUGH_DAH),
                KeyEvent::Release(Key::PASS_THROUGH_DIT),
                KeyEvent::Release(Key::PASS_THROUGH_DAH),
            ]
        );
        assert!(sim.capture().elements().is_empty());
        assert!(!sim.shared().tone.is_enabled());
    }

    #[test]
    fn test_pass_through_straight_key_is_silent() {
        let config = AdapterConfig { pass_through: true, ..AdapterConfig::default() };
        let mut sim = SimulatedAdapter::new(config, ModeSwitches::default()).unwrap();
        settle(&mut sim);

        sim.set_straight(true);
        sim.run_millis(20);
        assert_eq!(keys(&sim), vec![KeyEvent::Press(Key::STRAIGHT)]);
        assert!(!sim.shared().tone.is_enabled());
    }

    #[test]
    fn test_ptt_sends_shortcuts() {
        println!("\n=== PTT ===");
        let mut sim = SimulatedAdapter::keyer().unwrap();
        settle(&mut sim);

        sim.set_ptt(true);
        sim.run_millis(20);
        assert!(sim.adapter().ptt().is_on());
        sim.set_ptt(false);
        sim.run_millis(20);

        assert_eq!(
            keys(&sim),
            vec![
                KeyEvent::Press(Key::LeftAlt),
                KeyEvent::Press(Key::Char(b'i')),
                KeyEvent::Release(Key::Char(b'i')),
                KeyEvent::Release(Key::LeftAlt),
                KeyEvent::Press(Key::LeftAlt),
                KeyEvent::Press(Key::Char(b'o')),
                KeyEvent::Release(Key::Char(b'o')),
                KeyEvent::Release(Key::LeftAlt),
            ]
        );
        assert!(sim.capture().elements().is_empty());
    }

    #[test]
    fn test_speed_pot_changes_element_length() {
        let mut sim = SimulatedAdapter::keyer().unwrap();
        sim.panel.speed = 1023;
        settle(&mut sim);
        assert_eq!(sim.adapter().controller().wpm(), 50);

        sim.set_paddles(true, false);
        sim.run_millis(20);
        sim.set_paddles(false, false);
        sim.run_millis(100);

        let element = sim.capture().elements()[0];
        assert_eq!(element.duration(), 750);
    }

    #[test]
    fn test_pitch_pot_retunes_when_silent() {
        let mut sim = SimulatedAdapter::keyer().unwrap();
        settle(&mut sim);
        assert_eq!(sim.shared().tone.tuning_word(), tuning_word(750.0));

        sim.panel.pitch = 1023;
        sim.run_millis(1);
        assert_eq!(sim.shared().tone.tuning_word(), tuning_word(1200.0));
    }

    #[test]
    fn test_controls_frozen_while_tone_sounds() {
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);

        sim.set_straight(true);
        sim.run_millis(20);
        assert!(sim.shared().tone.is_enabled());

        let reads = sim.panel.analog_reads;
        sim.panel.pitch = 500;
        sim.run_millis(100);
        assert_eq!(sim.panel.analog_reads, reads);
        assert_eq!(sim.shared().tone.tuning_word(), tuning_word(750.0));

        sim.set_straight(false);
        sim.run_millis(20);
        assert!(sim.panel.analog_reads > reads);
        assert_ne!(sim.shared().tone.tuning_word(), tuning_word(750.0));
    }

    #[test]
    fn test_sidetone_audible_only_while_keyed() {
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);
        assert_eq!(sim.output_level(), 0);

        sim.set_straight(true);
        sim.run_millis(20);
        let mut peak = 0;
        for _ in 0..200 {
            sim.run_ticks(1);
            peak = peak.max(sim.output_level());
        }
        assert!(peak > 200);
    }

    #[test]
    fn test_switching_to_straight_mid_element_releases() {
        let mut sim = SimulatedAdapter::keyer().unwrap();
        settle(&mut sim);

        sim.set_paddles(false, true);
        sim.run_millis(20);
        assert!(sim.shared().tone.is_enabled());

        sim.set_switches(ModeSwitches::default());
        sim.run_millis(1);
        assert!(!sim.shared().tone.is_enabled());
        let spans = sim.emitter().keyed_spans(Key::STRAIGHT);
        assert_eq!(spans.len(), 1);
        assert_ne!(spans[0].1, u64::MAX);
    }

    #[test]
    fn test_switching_to_keyer_with_straight_key_held_releases() {
        let mut sim = SimulatedAdapter::straight().unwrap();
        settle(&mut sim);

        sim.set_straight(true);
        sim.run_millis(50);
        assert!(sim.shared().tone.is_enabled());

        sim.set_switches(KEYER);
        sim.run_millis(2000);
        assert!(!sim.shared().tone.is_enabled());
        let spans = sim.emitter().keyed_spans(Key::STRAIGHT);
        assert_eq!(spans.len(), 1);
        assert_ne!(spans[0].1, u64::MAX);

        // pots are read again once the tone is off
        sim.panel.speed = 654;
        sim.run_millis(1);
        assert_eq!(sim.adapter().controller().wpm(), 49);
    }
}
