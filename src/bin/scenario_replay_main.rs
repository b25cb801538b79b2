// Offline replay: random but reproducible traffic against the arbiter on a
// manual clock, as fast as the CPU allows. Writes the event log as CSV.
//
// Usage: scenario_replay_main [seconds] [seed] [output.csv] [script]
// where script is a comma separated list of `second:command`, e.g. "120:S,130:G".

use intersection_arbiter::config::ArbiterConfig;
use intersection_arbiter::control_system::IntersectionArbiter;
use intersection_arbiter::monitoring::{CsvEventLog, EventSink};
use intersection_arbiter::shared_data::{ArbiterEvent, JunctionId, Phase};
use intersection_arbiter::simulation_engine::{
    SimulatedIntersection, TrafficGenerator, TrafficProfile,
};
use intersection_arbiter::timing::{Clock, ManualClock};
use std::process;

fn parse_script(script: &str) -> Result<Vec<(u64, u8)>, String> {
    let mut steps = Vec::new();
    for entry in script.split(',').filter(|entry| !entry.trim().is_empty()) {
        let (second, command) = entry
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected second:command, got {:?}", entry))?;
        let second: u64 = second
            .parse()
            .map_err(|_| format!("bad second in {:?}", entry))?;
        let [byte] = command.as_bytes() else {
            return Err(format!("command must be one character in {:?}", entry));
        };
        steps.push((second, *byte));
    }
    steps.sort_by_key(|(second, _)| *second);
    Ok(steps)
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let seconds: u64 = args.first().and_then(|s| s.parse().ok()).unwrap_or(600);
    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(7);
    let output = args
        .get(2)
        .cloned()
        .unwrap_or_else(|| "scenario_events.csv".to_string());
    let script = match args.get(3).map(|s| parse_script(s)).transpose() {
        Ok(script) => script.unwrap_or_default(),
        Err(e) => {
            eprintln!("Script error: {}", e);
            process::exit(1);
        }
    };

    let config = ArbiterConfig::default();
    let tick = config.tick_interval();
    let clock = ManualClock::new();
    let intersection = SimulatedIntersection::new();
    let remote = intersection.link.clone();
    let hardware =
        intersection.field_hardware(&config, Box::new(intersection.link.clone()), seed);
    let mut arbiter = IntersectionArbiter::new(&config, hardware, Box::new(clock.clone()));
    let button = arbiter.crossing_button();
    let mut traffic = TrafficGenerator::new(TrafficProfile::default(), seed);

    let mut log = match CsvEventLog::append_to(&output) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Cannot open event log {}: {}", output, e);
            process::exit(1);
        }
    };

    println!(
        "Replaying {}s of traffic (seed {}, tick {} ms)...",
        seconds, seed, config.tick_interval_ms
    );

    let ticks = seconds * 1000 / config.tick_interval_ms.max(1);
    let mut pending_script = script.into_iter().peekable();
    let mut greens = [0u32; 2];
    let mut crossings = 0u32;
    let mut starvations = 0u32;

    for _ in 0..ticks {
        clock.advance(tick);
        let now = clock.now().as_secs();
        while let Some((_, byte)) = pending_script.next_if(|(second, _)| *second <= now) {
            remote.send(&[byte]);
        }

        traffic.step(&intersection, &button);
        arbiter.tick();

        let events = arbiter.drain_events();
        for timed in &events {
            match timed.event {
                ArbiterEvent::PhaseGreen(Phase::Junction(id)) => greens[id.index()] += 1,
                ArbiterEvent::PhaseGreen(Phase::Pedestrian) => crossings += 1,
                ArbiterEvent::StarvationFallback(_) => starvations += 1,
                _ => {}
            }
        }
        if let Err(e) = log.record(&events) {
            eprintln!("Event log error: {}", e);
            process::exit(1);
        }
    }

    println!("Vehicles arrived:      {}", traffic.vehicles());
    println!("Crossing presses:      {}", traffic.crossings());
    for id in JunctionId::ALL {
        println!("{} green phases:       {}", id, greens[id.index()]);
    }
    println!("Crossings served:      {}", crossings);
    println!("Starvation fallbacks:  {}", starvations);
    println!("Remote replies:        {:?}", remote.lines());
    println!("Final state:           {:?}", arbiter.state());
    println!("Events written to {}", output);
}
