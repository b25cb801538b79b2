// In-memory stand-ins for the board peripherals. Every handle is cheap to
// clone and clones share state, so a test keeps a handle while the arbiter
// owns the boxed original.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::peripherals::{
    AnalogChannel, CountdownDisplay, OutputLine, RemoteLink, SignalLamp, VehiclePresenceSensor,
};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test thread must not hide the recorded state from the others.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct LineState {
    level: AtomicBool,
    rises: AtomicU32,
}

/// A digital line backed by a shared flag. Counts its rising edges.
#[derive(Debug, Clone, Default)]
pub struct SharedLine(Arc<LineState>);

impl SharedLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rises(&self) -> u32 {
        self.0.rises.load(Ordering::SeqCst)
    }
}

impl OutputLine for SharedLine {
    fn write(&mut self, high: bool) {
        let was_high = self.0.level.swap(high, Ordering::SeqCst);
        if high && !was_high {
            self.0.rises.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_high(&self) -> bool {
        self.0.level.load(Ordering::SeqCst)
    }
}

/// Presence flag flipped by the traffic generator or a test.
#[derive(Debug, Clone, Default)]
pub struct VehiclePresence(Arc<AtomicBool>);

impl VehiclePresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arrive(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn depart(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn set(&self, present: bool) {
        self.0.store(present, Ordering::SeqCst);
    }

    pub fn is_present(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Presence sensor reading a [`VehiclePresence`] flag directly.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSensor {
    presence: VehiclePresence,
    calibrations: Arc<Mutex<u32>>,
}

impl SimulatedSensor {
    pub fn new(presence: VehiclePresence) -> Self {
        Self {
            presence,
            calibrations: Arc::default(),
        }
    }

    pub fn calibrations(&self) -> u32 {
        *locked(&self.calibrations)
    }
}

impl VehiclePresenceSensor for SimulatedSensor {
    fn read(&mut self) -> bool {
        self.presence.is_present()
    }

    fn calibrate(&mut self) -> f32 {
        *locked(&self.calibrations) += 1;
        0.0
    }
}

/// Analog receiver whose level rises while a vehicle is present, with a
/// little ambient noise on top. Feed it to a `ReflectanceSensor`.
#[derive(Debug, Clone)]
pub struct SimulatedReflectance {
    presence: VehiclePresence,
    ambient: f32,
    reflection: f32,
    noise: f32,
    rng: SmallRng,
}

impl SimulatedReflectance {
    pub fn new(presence: VehiclePresence, ambient: f32, reflection: f32, seed: u64) -> Self {
        Self {
            presence,
            ambient,
            reflection,
            noise: 0.02,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl AnalogChannel for SimulatedReflectance {
    fn sample(&mut self) -> f32 {
        let jitter = self.rng.random_range(-self.noise..=self.noise);
        let level = if self.presence.is_present() {
            self.ambient + self.reflection
        } else {
            self.ambient
        };
        (level + jitter).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Default)]
struct LampState {
    green: bool,
    green_count: u32,
}

/// Signal head that remembers how often it went green.
#[derive(Debug, Clone, Default)]
pub struct SimulatedLamp(Arc<Mutex<LampState>>);

impl SimulatedLamp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn green_count(&self) -> u32 {
        locked(&self.0).green_count
    }
}

impl SignalLamp for SimulatedLamp {
    fn set_green(&mut self) {
        let mut state = locked(&self.0);
        if !state.green {
            state.green_count += 1;
        }
        state.green = true;
    }

    fn set_red(&mut self) {
        locked(&self.0).green = false;
    }

    fn is_green(&self) -> bool {
        locked(&self.0).green
    }
}

#[derive(Debug, Default)]
struct DisplayState {
    shown: Vec<u8>,
    current: Option<u8>,
}

/// Countdown display that records every digit it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay(Arc<Mutex<DisplayState>>);

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn digits(&self) -> Vec<u8> {
        locked(&self.0).shown.clone()
    }

    pub fn current(&self) -> Option<u8> {
        locked(&self.0).current
    }

    pub fn is_blank(&self) -> bool {
        self.current().is_none()
    }
}

impl CountdownDisplay for RecordingDisplay {
    fn show_digit(&mut self, digit: u8) {
        if digit > 9 {
            return;
        }
        let mut state = locked(&self.0);
        state.shown.push(digit);
        state.current = Some(digit);
    }

    fn clear(&mut self) {
        locked(&self.0).current = None;
    }
}

#[derive(Debug, Default)]
struct LinkState {
    inbox: VecDeque<u8>,
    outbox: Vec<String>,
}

/// Remote link fed from a script; captures everything written back.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLink(Arc<Mutex<LinkState>>);

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, bytes: &[u8]) {
        locked(&self.0).inbox.extend(bytes.iter().copied());
    }

    pub fn lines(&self) -> Vec<String> {
        locked(&self.0).outbox.clone()
    }
}

impl RemoteLink for ScriptedLink {
    fn try_read_byte(&mut self) -> Option<u8> {
        locked(&self.0).inbox.pop_front()
    }

    fn write_line(&mut self, text: &str) {
        locked(&self.0).outbox.push(text.to_string());
    }
}
