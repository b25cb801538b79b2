use crate::config::ArbiterConfig;
use crate::control_system::arbiter::{IntersectionHardware, JunctionHardware};
use crate::peripherals::{DualLineLamp, ReflectanceSensor, RemoteLink, VehiclePresenceSensor};
use crate::simulation_engine::hardware::{
    RecordingDisplay, ScriptedLink, SharedLine, SimulatedLamp, SimulatedReflectance,
    SimulatedSensor, VehiclePresence,
};

// Ambient IR level and the extra reflection of a vehicle, as seen by the
// simulated receivers.
const AMBIENT_LEVEL: f32 = 0.15;
const VEHICLE_REFLECTION: f32 = 0.55;

/// A whole simulated intersection. Keeps a handle on every peripheral it hands
/// to the arbiter.
#[derive(Debug, Clone)]
pub struct SimulatedIntersection {
    pub presence: [VehiclePresence; 2],
    pub sensors: [SimulatedSensor; 2],
    pub lamps: [SimulatedLamp; 2],
    pub pedestrian_lamp: SimulatedLamp,
    /// Red and green lines of the crossing head used by `field_hardware`.
    pub crossing_lines: [SharedLine; 2],
    pub display: RecordingDisplay,
    pub link: ScriptedLink,
}

impl Default for SimulatedIntersection {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedIntersection {
    pub fn new() -> Self {
        let presence = [VehiclePresence::new(), VehiclePresence::new()];
        let sensors = [
            SimulatedSensor::new(presence[0].clone()),
            SimulatedSensor::new(presence[1].clone()),
        ];
        Self {
            presence,
            sensors,
            lamps: [SimulatedLamp::new(), SimulatedLamp::new()],
            pedestrian_lamp: SimulatedLamp::new(),
            crossing_lines: [SharedLine::new(), SharedLine::new()],
            display: RecordingDisplay::new(),
            link: ScriptedLink::new(),
        }
    }

    /// Ideal sensors and the scripted remote link.
    pub fn hardware(&self) -> IntersectionHardware {
        IntersectionHardware {
            junction_one: JunctionHardware {
                sensor: Box::new(self.sensors[0].clone()),
                lamp: Box::new(self.lamps[0].clone()),
            },
            junction_two: JunctionHardware {
                sensor: Box::new(self.sensors[1].clone()),
                lamp: Box::new(self.lamps[1].clone()),
            },
            pedestrian_lamp: Box::new(self.pedestrian_lamp.clone()),
            display: Box::new(self.display.clone()),
            remote_link: Box::new(self.link.clone()),
        }
    }

    /// Noisy reflectance sensors behind the real sensor driver, lamps behind
    /// the two-line driver, and a caller-supplied remote link.
    pub fn field_hardware(
        &self,
        config: &ArbiterConfig,
        remote_link: Box<dyn RemoteLink>,
        seed: u64,
    ) -> IntersectionHardware {
        let sensor = |index: usize, sensitivity: f32| {
            let channel = SimulatedReflectance::new(
                self.presence[index].clone(),
                AMBIENT_LEVEL,
                VEHICLE_REFLECTION,
                seed.wrapping_add(index as u64),
            );
            let mut sensor = ReflectanceSensor::new(
                channel,
                SharedLine::new(),
                Some(SharedLine::new()),
                sensitivity,
            );
            sensor.calibrate();
            sensor
        };
        IntersectionHardware {
            junction_one: JunctionHardware {
                sensor: Box::new(sensor(0, config.junction_one.sensitivity)),
                lamp: Box::new(self.lamps[0].clone()),
            },
            junction_two: JunctionHardware {
                sensor: Box::new(sensor(1, config.junction_two.sensitivity)),
                lamp: Box::new(self.lamps[1].clone()),
            },
            pedestrian_lamp: Box::new(DualLineLamp::new(
                self.crossing_lines[0].clone(),
                self.crossing_lines[1].clone(),
            )),
            display: Box::new(self.display.clone()),
            remote_link,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_system::arbiter::{ArbiterState, IntersectionArbiter};
    use crate::peripherals::{OutputLine, SignalLamp};
    use crate::shared_data::JunctionId;
    use crate::timing::ManualClock;
    use std::time::Duration;

    #[test]
    fn field_hardware_detects_vehicles_through_the_sensor_driver() {
        let intersection = SimulatedIntersection::new();
        let config = ArbiterConfig::default();
        let clock = ManualClock::new();
        let hardware = intersection.field_hardware(&config, Box::new(ScriptedLink::new()), 3);
        let mut arbiter = IntersectionArbiter::new(&config, hardware, Box::new(clock.clone()));
        assert_eq!(arbiter.state(), ArbiterState::J1Green);

        intersection.presence[1].arrive();
        let mut waited = false;
        for _ in 0..20 {
            clock.advance(Duration::from_millis(100));
            arbiter.tick();
            waited |= arbiter.junction(JunctionId::Two).pending().is_pending();
        }
        assert!(waited);
    }

    #[test]
    fn self_test_cycles_the_outputs_handed_to_the_arbiter() {
        let intersection = SimulatedIntersection::new();
        let mut hardware = intersection.hardware();
        hardware.run_self_test();
        for lamp in intersection.lamps.iter().chain([&intersection.pedestrian_lamp]) {
            assert_eq!(lamp.green_count(), 1);
            assert!(!lamp.is_green());
        }
        assert_eq!(intersection.display.digits().len(), 10);
        assert!(intersection.display.is_blank());
    }

    #[test]
    fn field_crossing_head_is_the_one_self_tested() {
        let intersection = SimulatedIntersection::new();
        let config = ArbiterConfig::default();
        let mut hardware = intersection.field_hardware(&config, Box::new(ScriptedLink::new()), 5);
        let [red, green] = &intersection.crossing_lines;
        assert!(red.is_high());
        assert_eq!(green.rises(), 0);

        hardware.run_self_test();
        assert_eq!(green.rises(), 1);
        assert!(!green.is_high());
        assert!(red.is_high());
    }
}
