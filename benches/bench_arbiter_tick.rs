// benches/bench_arbiter_tick.rs

use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use intersection_arbiter::config::ArbiterConfig;
use intersection_arbiter::control_system::IntersectionArbiter;
use intersection_arbiter::simulation_engine::{
    SimulatedIntersection, TrafficGenerator, TrafficProfile,
};
use intersection_arbiter::timing::ManualClock;
use std::time::Duration;

fn bench_arbiter_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("arbiter_tick");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    // Idle road, light traffic and a busy road with frequent crossing requests.
    let profiles = [
        ("idle", [0.0, 0.0], 0.0),
        ("light", [0.02, 0.01], 0.002),
        ("busy", [0.2, 0.2], 0.02),
    ];

    for (name, arrivals, crossings) in profiles {
        group.bench_function(name, |b| {
            let config = ArbiterConfig::default();
            let clock = ManualClock::new();
            let intersection = SimulatedIntersection::new();
            let mut arbiter =
                IntersectionArbiter::new(&config, intersection.hardware(), Box::new(clock.clone()));
            let button = arbiter.crossing_button();
            let profile = TrafficProfile {
                arrival_probability: arrivals,
                crossing_probability: crossings,
                ..TrafficProfile::default()
            };
            let mut traffic = TrafficGenerator::new(profile, 1);

            b.iter(|| {
                clock.advance(config.tick_interval());
                traffic.step(&intersection, &button);
                black_box(arbiter.tick());
                black_box(arbiter.drain_events());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_arbiter_tick);
criterion_main!(benches);
