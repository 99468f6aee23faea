//! Squeeze, memory and repetition behaviour of the paddle keyer

#[cfg(test)]
mod tests {
    use adapter_core::test_utils::SimulatedAdapter;
    use adapter_core::{AdapterConfig, Key, KeyerAction, ModeSwitches};

    const DIT: u64 = 1875;
    const DAH: u64 = 5625;
    const PAUSE: u64 = 1875;
    const POLL: u64 = 8;

    /// A keyer that has been powered for long enough to accept elements
    fn settled(iambic: bool) -> SimulatedAdapter {
        let mut sim = SimulatedAdapter::new(
            AdapterConfig::default(),
            ModeSwitches { automatic: true, iambic, inverted: false },
        )
        .unwrap();
        sim.run_millis(100);
        sim
    }

    fn assert_alternates(actions: &[KeyerAction]) {
        for pair in actions.windows(2) {
            assert_eq!(pair[1], pair[0].opposite(), "sequence {:?}", actions);
        }
    }

    #[test]
    fn test_iambic_squeeze_alternates() {
        println!("\n=== Iambic squeeze ===");
        let mut sim = settled(true);
        sim.set_paddles(true, true);
        sim.run_millis(1000);

        let actions = sim.capture().actions();
        println!("elements: {}", sim.capture().to_morse_string(PAUSE));
        assert!(actions.len() >= 6);
        assert_eq!(actions[0], KeyerAction::Dit);
        assert_alternates(&actions);
    }

    #[test]
    fn test_squeeze_keeps_one_pause_between_elements() {
        let mut sim = settled(true);
        sim.set_paddles(true, true);
        sim.run_millis(1000);

        let elements = sim.capture().elements();
        for pair in elements.windows(2) {
            assert_eq!(pair[1].start, pair[0].end + PAUSE);
        }
    }

    #[test]
    fn test_key_output_tracks_elements() {
        let mut sim = settled(true);
        sim.set_paddles(true, true);
        sim.run_millis(600);
        sim.set_paddles(false, false);
        sim.run_millis(600);

        let spans = sim.emitter().keyed_spans(Key::STRAIGHT);
        let elements = sim.capture().elements();
        assert_eq!(spans.len(), elements.len());
        for (span, element) in spans.iter().zip(elements) {
            assert!(span.0 >= element.start && span.0 - element.start < POLL);
            assert!(span.1 >= element.end && span.1 - element.end < POLL);
        }
        assert!(!sim.shared().tone.is_enabled());
    }

    #[test]
    fn test_non_iambic_squeeze_repeats() {
        println!("\n=== Non-iambic squeeze ===");
        let mut sim = settled(false);
        sim.set_paddles(true, true);
        sim.run_millis(1000);

        // dah is looked at first, the queued dit then takes over and repeats
        let actions = sim.capture().actions();
        println!("elements: {}", sim.capture().to_morse_string(PAUSE));
        assert_eq!(actions[0], KeyerAction::Dah);
        assert!(actions.len() > 3);
        assert!(actions[1..].iter().all(|a| *a == KeyerAction::Dit));
    }

    #[test]
    fn test_held_dit_repeats_every_two_units() {
        let mut sim = settled(true);
        sim.set_paddles(true, false);
        sim.run_millis(500);

        let elements = sim.capture().elements();
        assert!(elements.len() >= 4);
        for pair in elements.windows(2) {
            assert_eq!(pair[0].action, KeyerAction::Dit);
            assert_eq!(pair[1].start - pair[0].start, DIT + PAUSE);
        }
    }

    #[test]
    fn test_held_dah_repeats() {
        let mut sim = settled(true);
        sim.set_paddles(false, true);
        sim.run_millis(800);

        let elements = sim.capture().elements();
        assert!(elements.len() >= 3);
        assert!(elements.iter().all(|e| e.action == KeyerAction::Dah && e.duration() == DAH));
    }

    #[test]
    fn test_tapped_paddle_is_remembered() {
        println!("\n=== Element memory ===");
        let mut sim = settled(true);

        sim.set_paddles(true, false);
        sim.run_millis(20);
        // dah tapped and released while the dit is still sounding
        sim.set_paddles(true, true);
        sim.run_millis(10);
        sim.set_paddles(false, false);
        sim.run_millis(500);

        let capture = sim.capture();
        assert_eq!(capture.to_morse_string(PAUSE), ".-");
        let elements = capture.elements();
        assert_eq!(elements[1].start, elements[0].end + PAUSE);
        assert!(!sim.adapter().scheduler().dah_pending());
    }

    #[test]
    fn test_letters_are_separated() {
        let mut sim = settled(true);

        // "A": dit then dah via memory
        sim.set_paddles(true, false);
        sim.run_millis(20);
        sim.set_paddles(true, true);
        sim.run_millis(10);
        sim.set_paddles(false, false);
        sim.run_millis(400);

        // "E"
        sim.set_paddles(true, false);
        sim.run_millis(20);
        sim.set_paddles(false, false);
        sim.run_millis(200);

        assert_eq!(sim.capture().to_morse_string(PAUSE), ".- .");
    }

    #[test]
    fn test_pending_flags_never_both_set() {
        let mut sim = settled(true);
        let pattern = [(true, false), (true, true), (false, true), (true, true), (false, false)];
        for _ in 0..4 {
            for (dit, dah) in pattern {
                sim.set_paddles(dit, dah);
                for _ in 0..40 {
                    sim.run_ticks(7);
                    let scheduler = sim.adapter().scheduler();
                    assert!(!(scheduler.dit_pending() && scheduler.dah_pending()));
                }
            }
        }
    }
}
