use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source shared by every timer in the controller.
pub trait Clock: Send {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, at: Duration) {
        self.micros.store(at.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Stopwatch-style timer. Time only accumulates between `start` and `stop`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    accumulated: Duration,
    started_at: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the timer. Has no effect if it is already running.
    pub fn start(&mut self, now: Duration) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Freezes the accumulated time.
    pub fn stop(&mut self, now: Duration) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += now.saturating_sub(started_at);
        }
    }

    /// Zeroes and stops the timer.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started_at = None;
    }

    /// Zeroes the timer and starts it again from `now`.
    pub fn restart(&mut self, now: Duration) {
        self.reset();
        self.start(now);
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + now.saturating_sub(started_at),
            None => self.accumulated,
        }
    }
}
