use std::ops::RangeInclusive;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::control_system::pedestrian::PedestrianRequestLatch;
use crate::peripherals::SignalLamp;
use crate::simulation_engine::intersection::SimulatedIntersection;

/// Per-tick probabilities driving the simulated road.
#[derive(Debug, Clone)]
pub struct TrafficProfile {
    /// Chance that a vehicle pulls up to an empty junction, per tick, J1 then J2.
    pub arrival_probability: [f64; 2],
    /// Ticks a vehicle spends over the sensor once it has green.
    pub pass_ticks: RangeInclusive<u32>,
    /// Chance that someone presses the crossing button, per tick.
    pub crossing_probability: f64,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        Self {
            arrival_probability: [0.02, 0.01],
            pass_ticks: 5..=15,
            crossing_probability: 0.002,
        }
    }
}

/// Random but reproducible traffic: vehicles queue at red, roll over the
/// sensor for a few ticks on green, then leave.
pub struct TrafficGenerator {
    profile: TrafficProfile,
    rng: SmallRng,
    remaining: [Option<u32>; 2],
    vehicles: u64,
    crossings: u64,
}

impl TrafficGenerator {
    pub fn new(profile: TrafficProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: SmallRng::seed_from_u64(seed),
            remaining: [None, None],
            vehicles: 0,
            crossings: 0,
        }
    }

    /// Vehicles that arrived so far.
    pub fn vehicles(&self) -> u64 {
        self.vehicles
    }

    pub fn crossings(&self) -> u64 {
        self.crossings
    }

    /// Advances the road by one control tick.
    pub fn step(&mut self, intersection: &SimulatedIntersection, button: &PedestrianRequestLatch) {
        for index in 0..2 {
            let presence = &intersection.presence[index];
            let green = intersection.lamps[index].is_green();
            match self.remaining[index] {
                Some(0) => {
                    presence.depart();
                    self.remaining[index] = None;
                }
                Some(ticks) => {
                    // Queued vehicles only move on green.
                    if green {
                        self.remaining[index] = Some(ticks - 1);
                    }
                }
                None => {
                    if self.rng.random_bool(self.profile.arrival_probability[index]) {
                        presence.arrive();
                        self.vehicles += 1;
                        let ticks = self.rng.random_range(self.profile.pass_ticks.clone());
                        self.remaining[index] = Some(ticks);
                    }
                }
            }
        }

        if self.rng.random_bool(self.profile.crossing_probability) {
            self.crossings += 1;
            button.press();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicles_wait_for_green_then_leave() {
        let intersection = SimulatedIntersection::new();
        let button = PedestrianRequestLatch::new();
        let profile = TrafficProfile {
            arrival_probability: [1.0, 0.0],
            pass_ticks: 2..=2,
            crossing_probability: 0.0,
        };
        let mut traffic = TrafficGenerator::new(profile, 1);

        traffic.step(&intersection, &button);
        assert!(intersection.presence[0].is_present());
        assert!(!intersection.presence[1].is_present());

        // Red: the vehicle stays on the sensor.
        for _ in 0..5 {
            traffic.step(&intersection, &button);
        }
        assert!(intersection.presence[0].is_present());

        intersection.lamps[0].clone().set_green();
        traffic.step(&intersection, &button);
        traffic.step(&intersection, &button);
        traffic.step(&intersection, &button);
        assert!(!intersection.presence[0].is_present());
        assert_eq!(traffic.vehicles(), 1);
        assert!(!button.take());
    }

    #[test]
    fn same_seed_same_traffic() {
        let run = |seed| {
            let intersection = SimulatedIntersection::new();
            let button = PedestrianRequestLatch::new();
            let mut traffic = TrafficGenerator::new(TrafficProfile::default(), seed);
            for _ in 0..2_000 {
                traffic.step(&intersection, &button);
            }
            (traffic.vehicles(), traffic.crossings())
        };
        assert_eq!(run(11), run(11));
    }
}
