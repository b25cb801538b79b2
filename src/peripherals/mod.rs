//! Hardware collaborators of the arbiter.
//!
//! The control logic never touches pins directly; it owns boxed trait objects
//! handed over at construction. Real boards implement these traits on top of
//! their HAL, the simulation engine implements them in memory.

pub mod lamp;
pub mod self_test;
pub mod sensor;

pub use lamp::DualLineLamp;
pub use self_test::run_self_test;
pub use sensor::ReflectanceSensor;

/// A single digital output line.
pub trait OutputLine: Send {
    fn write(&mut self, high: bool);
    fn is_high(&self) -> bool;
}

/// A single analog input, normalised to `0.0..=1.0`.
pub trait AnalogChannel: Send {
    fn sample(&mut self) -> f32;
}

/// Converts a reflectance reading into "object present".
pub trait VehiclePresenceSensor: Send {
    fn read(&mut self) -> bool;
    /// Re-measures the ambient baseline and returns it.
    fn calibrate(&mut self) -> f32;
}

/// Red/green signal head for one phase.
pub trait SignalLamp: Send {
    fn set_green(&mut self);
    fn set_red(&mut self);
    fn is_green(&self) -> bool;
}

/// Seven-segment indicator used during the pedestrian countdown.
pub trait CountdownDisplay: Send {
    /// Shows a single digit. Values above 9 are ignored.
    fn show_digit(&mut self, digit: u8);
    fn clear(&mut self);
}

/// Byte-oriented operator channel (serial, Bluetooth, stdin...).
pub trait RemoteLink: Send {
    fn try_read_byte(&mut self) -> Option<u8>;
    fn write_line(&mut self, text: &str);
}
