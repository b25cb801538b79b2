use intersection_arbiter::communication::{channel_link, forward_bytes};
use intersection_arbiter::config::ArbiterConfig;
use intersection_arbiter::control_system::{run_control_loop, IntersectionArbiter};
use intersection_arbiter::monitoring::{CsvEventLog, LogSink, Tee};
use intersection_arbiter::simulation_engine::{
    SimulatedIntersection, TrafficGenerator, TrafficProfile,
};
use intersection_arbiter::timing::MonotonicClock;
use std::process;

const EVENT_LOG: &str = "intersection_events.csv";

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match ArbiterConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                process::exit(1);
            }
        },
        None => ArbiterConfig::default(),
    };
    let event_log_path = args.next().unwrap_or_else(|| EVENT_LOG.to_string());

    println!(
        "Starting intersection controller (tick {} ms, events -> {})...",
        config.tick_interval_ms, event_log_path
    );
    println!("Remote commands: 1, 2, P, C, S, G (press Enter to send). Ctrl-C quits.");

    let intersection = SimulatedIntersection::new();

    let (tx, link) = channel_link();
    tokio::spawn(async move {
        if let Err(e) = forward_bytes(tokio::io::stdin(), tx).await {
            eprintln!("Remote input error: {}", e);
        }
    });

    let seed: u64 = rand::random();
    let mut hardware = intersection.field_hardware(&config, Box::new(link), seed);
    hardware.run_self_test();
    let arbiter = IntersectionArbiter::new(&config, hardware, Box::new(MonotonicClock::new()));

    let button = arbiter.crossing_button();
    let road = intersection.clone();
    let tick = config.tick_interval();
    tokio::spawn(async move {
        let mut traffic = TrafficGenerator::new(TrafficProfile::default(), seed);
        let mut ticker = tokio::time::interval(tick);
        loop {
            ticker.tick().await;
            traffic.step(&road, &button);
        }
    });

    let sink = match CsvEventLog::append_to(&event_log_path) {
        Ok(csv) => Tee(csv, LogSink),
        Err(e) => {
            eprintln!("Cannot open event log {}: {}", event_log_path, e);
            process::exit(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Signal handler error: {}", e);
        }
    };

    match run_control_loop(arbiter, tick, sink, shutdown).await {
        Ok(arbiter) => println!("Controller stopped in state {:?}", arbiter.state()),
        Err(e) => {
            eprintln!("Event log error: {}", e);
            process::exit(1);
        }
    }
}
