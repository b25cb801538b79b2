use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::global_variables::{COUNTDOWN_START, COUNTDOWN_STEP_SECS};
use crate::peripherals::{CountdownDisplay, SignalLamp};
use crate::timing::Timer;

/// Single-slot latch for the crossing button. Any number of presses between
/// two control ticks collapse into one request.
#[derive(Debug, Clone, Default)]
pub struct PedestrianRequestLatch(Arc<AtomicBool>);

impl PedestrianRequestLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Safe to call from an interrupt handler, another thread or a task.
    pub fn press(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Drains the latch.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    digit: u8,
    step_started: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStatus {
    Idle,
    /// A digit is on display; carries the digit shown after this step.
    Running(u8),
    /// The last digit expired and the crossing went red on this call.
    Finished,
}

/// The crossing: its lamp, the countdown display and the waiting timer.
pub struct PedestrianPhase {
    lamp: Box<dyn SignalLamp>,
    display: Box<dyn CountdownDisplay>,
    waiting_timer: Timer,
    remote_trigger: bool,
    countdown: Option<Countdown>,
    step: Duration,
}

impl PedestrianPhase {
    pub fn new(lamp: Box<dyn SignalLamp>, display: Box<dyn CountdownDisplay>) -> Self {
        Self {
            lamp,
            display,
            waiting_timer: Timer::new(),
            remote_trigger: false,
            countdown: None,
            step: Duration::from_secs(COUNTDOWN_STEP_SECS),
        }
    }

    pub fn is_green(&self) -> bool {
        self.lamp.is_green()
    }

    /// Green or still counting down.
    pub fn is_active(&self) -> bool {
        self.countdown.is_some() || self.lamp.is_green()
    }

    /// Starts the waiting timer. Only records intent, never changes a lamp.
    /// Returns `false` if a request was already pending.
    pub fn request_crossing(&mut self, now: Duration) -> bool {
        if self.waiting_timer.is_running() {
            return false;
        }
        self.waiting_timer.start(now);
        true
    }

    pub fn request_remote(&mut self) {
        self.remote_trigger = true;
    }

    pub fn remote_requested(&self) -> bool {
        self.remote_trigger
    }

    pub fn waiting_time(&self, now: Duration) -> Duration {
        self.waiting_timer.elapsed(now)
    }

    /// Whether the crossing has waited long enough to preempt traffic.
    pub fn is_due(&self, now: Duration, ped_wait_limit: Duration) -> bool {
        self.remote_trigger || self.waiting_timer.elapsed(now) > ped_wait_limit
    }

    /// Goes green and starts the countdown at 9. Non-blocking: drive the
    /// countdown with [`PedestrianPhase::advance`].
    pub fn change_green(&mut self, now: Duration) {
        self.lamp.set_green();
        self.remote_trigger = false;
        self.display.show_digit(COUNTDOWN_START);
        self.countdown = Some(Countdown {
            digit: COUNTDOWN_START,
            step_started: now,
        });
        log::info!("Crossing green, countdown from {}", COUNTDOWN_START);
    }

    /// Steps the countdown once per elapsed second. Several steps are taken
    /// if the caller fell behind, so the cadence never drifts.
    pub fn advance(&mut self, now: Duration) -> CountdownStatus {
        let Some(mut countdown) = self.countdown else {
            return CountdownStatus::Idle;
        };
        while now.saturating_sub(countdown.step_started) >= self.step {
            countdown.step_started += self.step;
            if countdown.digit == 0 {
                self.change_red();
                return CountdownStatus::Finished;
            }
            countdown.digit -= 1;
            self.display.show_digit(countdown.digit);
        }
        self.countdown = Some(countdown);
        CountdownStatus::Running(countdown.digit)
    }

    pub fn current_digit(&self) -> Option<u8> {
        self.countdown.map(|countdown| countdown.digit)
    }

    /// Red, display blank, waiting timer cleared.
    pub fn change_red(&mut self) {
        self.lamp.set_red();
        self.display.clear();
        self.countdown = None;
        self.waiting_timer.reset();
        log::info!("Crossing red");
    }

    /// Emergency stop: also forgets an operator request.
    pub fn halt(&mut self) {
        self.change_red();
        self.remote_trigger = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::hardware::{RecordingDisplay, SimulatedLamp};

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn phase() -> (PedestrianPhase, RecordingDisplay) {
        let display = RecordingDisplay::new();
        let phase = PedestrianPhase::new(Box::new(SimulatedLamp::new()), Box::new(display.clone()));
        (phase, display)
    }

    #[test]
    fn latch_collapses_presses() {
        let latch = PedestrianRequestLatch::new();
        let button = latch.clone();
        assert!(!latch.take());
        button.press();
        button.press();
        assert!(latch.take());
        assert!(!latch.take());
    }

    #[test]
    fn request_only_starts_the_waiting_timer() {
        let (mut phase, _) = phase();
        assert!(phase.request_crossing(secs(1.0)));
        assert!(!phase.request_crossing(secs(3.0)));
        assert!(!phase.is_green());
        assert_eq!(phase.waiting_time(secs(4.0)), secs(3.0));
        assert!(!phase.is_due(secs(4.0), secs(5.0)));
        assert!(phase.is_due(secs(6.5), secs(5.0)));
    }

    #[test]
    fn remote_request_is_due_immediately() {
        let (mut phase, _) = phase();
        phase.request_remote();
        assert!(phase.is_due(Duration::ZERO, secs(5.0)));
        phase.change_green(Duration::ZERO);
        assert!(!phase.remote_requested());
    }

    #[test]
    fn countdown_runs_nine_to_zero_at_one_hertz() {
        let (mut phase, display) = phase();
        phase.change_green(secs(10.0));
        assert!(phase.is_green());
        assert_eq!(phase.current_digit(), Some(9));

        assert_eq!(phase.advance(secs(10.5)), CountdownStatus::Running(9));
        assert_eq!(phase.advance(secs(11.0)), CountdownStatus::Running(8));
        for second in 12..=19 {
            let status = phase.advance(secs(second as f64));
            assert_eq!(status, CountdownStatus::Running((20 - second - 1) as u8));
        }
        assert_eq!(phase.current_digit(), Some(0));
        assert!(phase.is_green());

        assert_eq!(phase.advance(secs(20.0)), CountdownStatus::Finished);
        assert!(!phase.is_green());
        assert!(!phase.is_active());
        assert!(display.is_blank());
        assert_eq!(display.digits(), vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
        assert_eq!(phase.advance(secs(21.0)), CountdownStatus::Idle);
    }

    #[test]
    fn countdown_catches_up_after_a_late_tick() {
        let (mut phase, display) = phase();
        phase.change_green(Duration::ZERO);
        assert_eq!(phase.advance(secs(3.2)), CountdownStatus::Running(6));
        assert_eq!(display.digits(), vec![9, 8, 7, 6]);
        assert_eq!(phase.advance(secs(12.0)), CountdownStatus::Finished);
    }

    #[test]
    fn going_red_resets_the_waiting_timer() {
        let (mut phase, _) = phase();
        phase.request_crossing(Duration::ZERO);
        phase.change_green(secs(6.0));
        phase.change_red();
        assert_eq!(phase.waiting_time(secs(30.0)), Duration::ZERO);
        assert!(!phase.is_due(secs(30.0), secs(5.0)));
    }
}
