use super::{CountdownDisplay, SignalLamp};

/// Startup self-test: cycles every lamp and every display digit so a field
/// technician can see each output work once. Leaves every lamp red and the
/// display blank.
pub fn run_self_test(lamps: &mut [&mut dyn SignalLamp], display: &mut dyn CountdownDisplay) {
    log::info!("Running output self-test on {} lamps", lamps.len());
    for lamp in lamps.iter_mut() {
        lamp.set_green();
        lamp.set_red();
    }
    for digit in (0..=9).rev() {
        display.show_digit(digit);
    }
    display.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::hardware::{RecordingDisplay, SimulatedLamp};

    #[test]
    fn cycles_every_output_and_ends_red() {
        let mut first = SimulatedLamp::new();
        let mut second = SimulatedLamp::new();
        let first_view = first.clone();
        let display = RecordingDisplay::new();
        let mut display_handle = display.clone();

        let mut lamps: [&mut dyn SignalLamp; 2] = [&mut first, &mut second];
        run_self_test(&mut lamps, &mut display_handle);

        assert!(!first_view.is_green());
        assert_eq!(first_view.green_count(), 1);
        assert!(!second.is_green());
        assert_eq!(display.digits(), vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
        assert!(display.is_blank());
    }
}
