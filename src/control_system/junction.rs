use std::time::Duration;

use crate::config::JunctionConfig;
use crate::peripherals::{SignalLamp, VehiclePresenceSensor};
use crate::shared_data::JunctionId;
use crate::timing::Timer;

/// A phase change requested for a junction that is currently red.
///
/// Requests only ever escalate: an operator request replaces a vehicle
/// request, never the other way round. Completing the change clears it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PendingChange {
    #[default]
    None,
    VehicleTriggered,
    RemoteTriggered,
}

impl PendingChange {
    pub fn is_pending(self) -> bool {
        self != PendingChange::None
    }
}

/// Owns one approach: its sensor, its signal head, the debounce timer and
/// the fairness bookkeeping.
pub struct JunctionController {
    pub id: JunctionId,
    pub name: String,
    wait_limit: Duration,
    sensor: Box<dyn VehiclePresenceSensor>,
    lamp: Box<dyn SignalLamp>,
    wait_timer: Timer,
    previous_sensor_state: bool,
    pending: PendingChange,
    vehicle_counter_active: bool,
    surplus_vehicle_count: u32,
    surplus_vehicle_limit: u32,
}

impl JunctionController {
    pub fn new(
        id: JunctionId,
        config: &JunctionConfig,
        sensor: Box<dyn VehiclePresenceSensor>,
        lamp: Box<dyn SignalLamp>,
    ) -> Self {
        Self {
            id,
            name: config.name.clone(),
            wait_limit: config.wait_limit(),
            sensor,
            lamp,
            wait_timer: Timer::new(),
            previous_sensor_state: false,
            pending: PendingChange::None,
            vehicle_counter_active: false,
            surplus_vehicle_count: 0,
            surplus_vehicle_limit: config.surplus_vehicle_limit,
        }
    }

    pub fn is_green(&self) -> bool {
        self.lamp.is_green()
    }

    /// Polls the sensor once. Returns `true` once per debounce window when a
    /// vehicle has been present for longer than the wait limit.
    pub fn is_vehicle_waiting(&mut self, now: Duration) -> bool {
        if self.sensor.read() {
            self.previous_sensor_state = true;
            if !self.wait_timer.is_running() {
                log::debug!("{}: vehicle spotted, starting wait timer", self.name);
                self.wait_timer.start(now);
                false
            } else if self.wait_timer.elapsed(now) > self.wait_limit {
                log::debug!(
                    "{}: vehicle waiting {:.2}s",
                    self.name,
                    self.wait_timer.elapsed(now).as_secs_f64()
                );
                // Throttle: a vehicle that stays put starts a fresh window.
                self.wait_timer.reset();
                true
            } else {
                false
            }
        } else {
            if self.previous_sensor_state {
                self.surplus_vehicle_count += 1;
                if self.is_green() && self.vehicle_counter_active {
                    log::debug!(
                        "{}: vehicle passed, {} surplus vehicles remaining",
                        self.name,
                        self.surplus_allowance()
                    );
                }
            }
            self.previous_sensor_state = false;
            self.wait_timer.reset();
            false
        }
    }

    /// Switches the lamp green. Returns whether anything changed.
    pub fn change_green(&mut self) -> bool {
        if self.lamp.is_green() {
            return false;
        }
        self.lamp.set_green();
        log::info!("{}: signal green", self.name);
        true
    }

    /// Switches the lamp red. Returns whether anything changed.
    pub fn change_red(&mut self) -> bool {
        if !self.lamp.is_green() {
            return false;
        }
        self.lamp.set_red();
        log::info!("{}: signal red", self.name);
        true
    }

    pub fn pending(&self) -> PendingChange {
        self.pending
    }

    /// Records a request, keeping the stronger of the old and the new one.
    pub fn request(&mut self, change: PendingChange) {
        self.pending = self.pending.max(change);
    }

    pub fn clear_pending(&mut self) {
        self.pending = PendingChange::None;
    }

    pub fn start_vehicle_counter(&mut self) {
        self.surplus_vehicle_count = 0;
        self.vehicle_counter_active = true;
    }

    pub fn stop_vehicle_counter(&mut self) {
        self.vehicle_counter_active = false;
    }

    pub fn vehicle_counter_active(&self) -> bool {
        self.vehicle_counter_active
    }

    pub fn surplus_vehicle_count(&self) -> u32 {
        self.surplus_vehicle_count
    }

    pub fn surplus_allowance(&self) -> u32 {
        self.surplus_vehicle_limit
            .saturating_sub(self.surplus_vehicle_count)
    }

    /// True once enough vehicles have passed while the other side waited.
    pub fn surplus_exhausted(&self) -> bool {
        self.vehicle_counter_active && self.surplus_vehicle_count >= self.surplus_vehicle_limit
    }

    pub fn recalibrate(&mut self) -> f32 {
        self.sensor.calibrate()
    }

    /// Emergency stop: red, no pending request, debounce and counter cleared.
    pub fn halt(&mut self) {
        self.change_red();
        self.stop_vehicle_counter();
        self.clear_pending();
        self.wait_timer.reset();
        self.previous_sensor_state = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::hardware::{SimulatedLamp, SimulatedSensor, VehiclePresence};

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn junction(wait_limit: f64, surplus_limit: u32) -> (JunctionController, VehiclePresence) {
        let presence = VehiclePresence::new();
        let config = JunctionConfig {
            name: "Test".to_string(),
            wait_limit,
            surplus_vehicle_limit: surplus_limit,
            sensitivity: 0.3,
        };
        let junction = JunctionController::new(
            JunctionId::One,
            &config,
            Box::new(SimulatedSensor::new(presence.clone())),
            Box::new(SimulatedLamp::new()),
        );
        (junction, presence)
    }

    #[test]
    fn debounce_rejects_short_presence() {
        let (mut junction, presence) = junction(0.5, 3);
        presence.arrive();
        assert!(!junction.is_vehicle_waiting(ms(0)));
        assert!(!junction.is_vehicle_waiting(ms(250)));
        assert!(!junction.is_vehicle_waiting(ms(490)));
        presence.depart();
        assert!(!junction.is_vehicle_waiting(ms(500)));
        // The window restarted from scratch.
        presence.arrive();
        assert!(!junction.is_vehicle_waiting(ms(600)));
        assert!(!junction.is_vehicle_waiting(ms(1000)));
    }

    #[test]
    fn debounce_confirms_after_wait_limit() {
        let (mut junction, presence) = junction(0.5, 3);
        presence.arrive();
        assert!(!junction.is_vehicle_waiting(ms(0)));
        assert!(!junction.is_vehicle_waiting(ms(500)));
        assert!(junction.is_vehicle_waiting(ms(510)));
    }

    #[test]
    fn confirmation_is_reported_once_per_window() {
        let (mut junction, presence) = junction(0.5, 3);
        presence.arrive();
        junction.is_vehicle_waiting(ms(0));
        assert!(junction.is_vehicle_waiting(ms(600)));
        // Timer was reset: the next poll opens a new window.
        assert!(!junction.is_vehicle_waiting(ms(700)));
        assert!(!junction.is_vehicle_waiting(ms(1100)));
        assert!(junction.is_vehicle_waiting(ms(1300)));
    }

    #[test]
    fn departures_are_counted_as_surplus() {
        let (mut junction, presence) = junction(0.5, 2);
        junction.change_green();
        junction.start_vehicle_counter();
        assert!(!junction.surplus_exhausted());

        for step in 0..2u64 {
            presence.arrive();
            junction.is_vehicle_waiting(ms(step * 200));
            presence.depart();
            junction.is_vehicle_waiting(ms(step * 200 + 100));
        }
        assert_eq!(junction.surplus_vehicle_count(), 2);
        assert_eq!(junction.surplus_allowance(), 0);
        assert!(junction.surplus_exhausted());

        junction.stop_vehicle_counter();
        assert!(!junction.surplus_exhausted());
        assert_eq!(junction.surplus_vehicle_count(), 2);

        junction.start_vehicle_counter();
        assert_eq!(junction.surplus_vehicle_count(), 0);
    }

    #[test]
    fn phase_changes_are_idempotent() {
        let (mut junction, _) = junction(0.5, 3);
        assert!(!junction.change_red());
        assert!(junction.change_green());
        assert!(!junction.change_green());
        assert!(junction.is_green());
        assert!(junction.change_red());
        assert!(!junction.is_green());
    }

    #[test]
    fn requests_only_escalate() {
        let (mut junction, _) = junction(0.5, 3);
        junction.request(PendingChange::VehicleTriggered);
        assert_eq!(junction.pending(), PendingChange::VehicleTriggered);
        junction.request(PendingChange::RemoteTriggered);
        junction.request(PendingChange::VehicleTriggered);
        assert_eq!(junction.pending(), PendingChange::RemoteTriggered);
        junction.clear_pending();
        assert!(!junction.pending().is_pending());
    }

    #[test]
    fn halt_clears_everything() {
        let (mut junction, presence) = junction(0.5, 3);
        junction.change_green();
        junction.start_vehicle_counter();
        junction.request(PendingChange::RemoteTriggered);
        presence.arrive();
        junction.is_vehicle_waiting(ms(0));

        junction.halt();
        assert!(!junction.is_green());
        assert!(!junction.vehicle_counter_active());
        assert_eq!(junction.pending(), PendingChange::None);
        // Debounce restarts after a halt.
        assert!(!junction.is_vehicle_waiting(ms(5000)));
    }
}
