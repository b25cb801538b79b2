use super::{AnalogChannel, OutputLine, VehiclePresenceSensor};

/// IR reflectance presence sensor: an emitter, a receiver and an optional
/// indicator lamp that mirrors the last reading.
pub struct ReflectanceSensor<A, L> {
    receiver: A,
    emitter: L,
    indicator: Option<L>,
    /// Presence threshold on the corrected reading.
    sensitivity: f32,
    baseline: f32,
}

impl<A: AnalogChannel, L: OutputLine> ReflectanceSensor<A, L> {
    pub fn new(receiver: A, mut emitter: L, mut indicator: Option<L>, sensitivity: f32) -> Self {
        emitter.write(false);
        if let Some(indicator) = indicator.as_mut() {
            indicator.write(false);
        }
        Self {
            receiver,
            emitter,
            indicator,
            sensitivity,
            baseline: 0.0,
        }
    }

    /// Emitter-on reading with the ambient baseline removed.
    fn corrected_reading(&mut self) -> f32 {
        self.emitter.write(true);
        self.receiver.sample() - self.baseline
    }
}

impl<A: AnalogChannel, L: OutputLine> VehiclePresenceSensor for ReflectanceSensor<A, L> {
    fn read(&mut self) -> bool {
        let present = self.corrected_reading() > self.sensitivity;
        if let Some(indicator) = self.indicator.as_mut() {
            indicator.write(present);
        }
        present
    }

    fn calibrate(&mut self) -> f32 {
        // Ambient light only: sample with the emitter dark.
        self.emitter.write(false);
        self.baseline = self.receiver.sample();
        self.emitter.write(true);
        log::info!("Sensor calibrated, ambient baseline {:.3}", self.baseline);
        self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::hardware::SharedLine;
    use std::collections::VecDeque;

    struct Samples(VecDeque<f32>);

    impl AnalogChannel for Samples {
        fn sample(&mut self) -> f32 {
            self.0.pop_front().unwrap_or(0.0)
        }
    }

    #[test]
    fn subtracts_baseline_before_thresholding() {
        let indicator = SharedLine::new();
        let mut sensor = ReflectanceSensor::new(
            Samples(VecDeque::from(vec![0.4, 0.65, 0.75])),
            SharedLine::new(),
            Some(indicator.clone()),
            0.3,
        );

        assert_eq!(sensor.calibrate(), 0.4);
        // 0.65 - 0.4 = 0.25, below the threshold
        assert!(!sensor.read());
        assert!(!indicator.is_high());
        // 0.75 - 0.4 = 0.35
        assert!(sensor.read());
        assert!(indicator.is_high());
    }

    #[test]
    fn uncalibrated_sensor_uses_zero_baseline() {
        let mut sensor = ReflectanceSensor::new(
            Samples(VecDeque::from(vec![0.31])),
            SharedLine::new(),
            None,
            0.3,
        );
        assert!(sensor.read());
    }

    #[test]
    fn emitter_is_lit_while_reading() {
        let emitter = SharedLine::new();
        let mut sensor =
            ReflectanceSensor::new(Samples(VecDeque::new()), emitter.clone(), None, 0.5);
        assert!(!emitter.is_high());
        sensor.read();
        assert!(emitter.is_high());
    }
}
