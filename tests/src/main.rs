// Prints a squeeze timeline from the simulated adapter

use adapter_core::test_utils::SimulatedAdapter;
use adapter_core::{ticks_to_millis, Key, KeyerAction};
use core::fmt::Write;
use heapless::String;

const COLUMNS: usize = 100;

fn main() {
    println!("Morse key adapter simulator v{}", adapter_core::VERSION);

    let mut sim = match SimulatedAdapter::keyer() {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("simulator start failed: {:?}", e);
            return;
        }
    };

    sim.run_millis(100);
    sim.set_paddles(true, true);
    sim.run_millis(800);
    sim.set_paddles(false, false);
    sim.run_millis(400);

    let timing = *sim.adapter().scheduler().timing();
    println!(
        "{} WPM: dit {} ticks, dah {} ticks, pause {} ticks",
        timing.wpm, timing.dit_ticks, timing.dah_ticks, timing.pause_ticks
    );
    println!("sent: {}", sim.capture().to_morse_string(timing.pause_ticks));
    println!();

    for element in sim.capture().elements() {
        let name = match element.action {
            KeyerAction::Dah => "dah",
            _ => "dit",
        };
        println!(
            "{:>3}  {:>6} .. {:>6}  ({} ms)",
            name,
            element.start,
            element.end,
            ticks_to_millis(element.duration())
        );
    }

    // one column per 10 ms of key-down time
    let spans = sim.emitter().keyed_spans(Key::STRAIGHT);
    let origin = spans.first().map(|s| s.0).unwrap_or(0);
    let mut line: String<COLUMNS> = String::new();
    for column in 0..COLUMNS as u64 {
        let tick = origin + column * 312;
        let keyed = spans.iter().any(|&(down, up)| tick >= down && tick < up);
        if write!(line, "{}", if keyed { '#' } else { '_' }).is_err() {
            break;
        }
    }
    println!();
    println!("{}", line);
}
