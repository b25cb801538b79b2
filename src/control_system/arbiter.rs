use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::config::{ArbiterConfig, ArbiterTimings};
use crate::control_system::junction::{JunctionController, PendingChange};
use crate::control_system::pedestrian::{CountdownStatus, PedestrianPhase, PedestrianRequestLatch};
use crate::control_system::remote::{RemoteCommand, RemoteCommandHandler};
use crate::error::EventLogError;
use crate::monitoring::event_log::EventSink;
use crate::peripherals::{
    run_self_test, CountdownDisplay, RemoteLink, SignalLamp, VehiclePresenceSensor,
};
use crate::shared_data::{ArbiterEvent, HandoffReason, JunctionId, Phase, TimedEvent};
use crate::timing::{Clock, Timer};

/// Sensor and signal head of one approach.
pub struct JunctionHardware {
    pub sensor: Box<dyn VehiclePresenceSensor>,
    pub lamp: Box<dyn SignalLamp>,
}

/// Every peripheral the arbiter owns for its whole lifetime.
pub struct IntersectionHardware {
    pub junction_one: JunctionHardware,
    pub junction_two: JunctionHardware,
    pub pedestrian_lamp: Box<dyn SignalLamp>,
    pub display: Box<dyn CountdownDisplay>,
    pub remote_link: Box<dyn RemoteLink>,
}

impl IntersectionHardware {
    /// Walks every lamp and the display once. Run it on the bundle that is
    /// about to be handed to the arbiter.
    pub fn run_self_test(&mut self) {
        let mut lamps: [&mut dyn SignalLamp; 3] = [
            self.junction_one.lamp.as_mut(),
            self.junction_two.lamp.as_mut(),
            self.pedestrian_lamp.as_mut(),
        ];
        run_self_test(&mut lamps, self.display.as_mut());
    }
}

/// Externally visible state of the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterState {
    J1Green,
    J2Green,
    /// All red; carries the phase that will get green next, if one is known.
    Transitioning(Option<Phase>),
    PedestrianGreen,
    EmergencyStopped,
}

fn record(events: &mut Vec<TimedEvent>, at: Duration, event: ArbiterEvent) {
    log::debug!("[{:>9.3}s] {}", at.as_secs_f64(), event);
    events.push(TimedEvent { at, event });
}

fn pair_mut(
    junctions: &mut [JunctionController; 2],
    id: JunctionId,
) -> (&mut JunctionController, &mut JunctionController) {
    let [one, two] = junctions;
    match id {
        JunctionId::One => (one, two),
        JunctionId::Two => (two, one),
    }
}

/// The control loop state machine: two junctions, one crossing, the shared
/// safe-passage / transition / starvation timers and the emergency interlock.
pub struct IntersectionArbiter {
    timings: ArbiterTimings,
    clock: Box<dyn Clock>,
    junctions: [JunctionController; 2],
    pedestrian: PedestrianPhase,
    crossing_requests: PedestrianRequestLatch,
    remote: RemoteCommandHandler,
    safe_passage_timer: Timer,
    transition_timer: Timer,
    starvation_timer: Timer,
    /// Junction that owns the current all-red interval. Only it may go green.
    transition_target: Option<JunctionId>,
    emergency_stopped: bool,
    events: Vec<TimedEvent>,
}

impl IntersectionArbiter {
    /// Takes ownership of the hardware and runs the startup sequence:
    /// J2 red, crossing red, J1 green.
    pub fn new(config: &ArbiterConfig, hardware: IntersectionHardware, clock: Box<dyn Clock>) -> Self {
        let IntersectionHardware {
            junction_one,
            junction_two,
            pedestrian_lamp,
            display,
            remote_link,
        } = hardware;

        let mut arbiter = Self {
            timings: config.timings(),
            clock,
            junctions: [
                JunctionController::new(
                    JunctionId::One,
                    &config.junction_one,
                    junction_one.sensor,
                    junction_one.lamp,
                ),
                JunctionController::new(
                    JunctionId::Two,
                    &config.junction_two,
                    junction_two.sensor,
                    junction_two.lamp,
                ),
            ],
            pedestrian: PedestrianPhase::new(pedestrian_lamp, display),
            crossing_requests: PedestrianRequestLatch::new(),
            remote: RemoteCommandHandler::new(remote_link),
            safe_passage_timer: Timer::new(),
            transition_timer: Timer::new(),
            starvation_timer: Timer::new(),
            transition_target: None,
            emergency_stopped: false,
            events: Vec::new(),
        };
        arbiter.startup();
        arbiter
    }

    fn startup(&mut self) {
        let now = self.clock.now();
        self.junctions[JunctionId::Two.index()].change_red();
        self.pedestrian.change_red();
        self.junctions[JunctionId::One.index()].change_green();
        self.safe_passage_timer.restart(now);
        self.starvation_timer.restart(now);
        record(&mut self.events, now, ArbiterEvent::Started);
    }

    /// Handle for the crossing button. Clone it into whatever delivers presses.
    pub fn crossing_button(&self) -> PedestrianRequestLatch {
        self.crossing_requests.clone()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn junction(&self, id: JunctionId) -> &JunctionController {
        &self.junctions[id.index()]
    }

    pub fn pedestrian(&self) -> &PedestrianPhase {
        &self.pedestrian
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stopped
    }

    /// Every phase currently showing green. Never more than one.
    pub fn green_phases(&self) -> Vec<Phase> {
        let mut greens: Vec<Phase> = self
            .junctions
            .iter()
            .filter(|junction| junction.is_green())
            .map(|junction| Phase::Junction(junction.id))
            .collect();
        if self.pedestrian.is_green() {
            greens.push(Phase::Pedestrian);
        }
        greens
    }

    pub fn state(&self) -> ArbiterState {
        if self.emergency_stopped {
            return ArbiterState::EmergencyStopped;
        }
        if self.pedestrian.is_green() {
            return ArbiterState::PedestrianGreen;
        }
        if self.junctions[0].is_green() {
            return ArbiterState::J1Green;
        }
        if self.junctions[1].is_green() {
            return ArbiterState::J2Green;
        }
        let target = if self
            .pedestrian
            .is_due(self.clock.now(), self.timings.ped_wait_limit)
        {
            Some(Phase::Pedestrian)
        } else {
            self.transition_target.map(Phase::Junction)
        };
        ArbiterState::Transitioning(target)
    }

    /// Hands over everything recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<TimedEvent> {
        std::mem::take(&mut self.events)
    }

    /// One pass of the control loop.
    pub fn tick(&mut self) -> ArbiterState {
        let now = self.clock.now();
        self.poll_remote(now);

        if self.emergency_stopped {
            if self.crossing_requests.take() {
                log::debug!("Crossing request ignored while stopped");
            }
            return self.state();
        }

        if self.crossing_requests.take() && self.pedestrian.request_crossing(now) {
            record(&mut self.events, now, ArbiterEvent::PedestrianRequested);
        }

        if self.pedestrian.is_active() {
            self.advance_crossing(now);
        }

        let crossing = self.pedestrian.is_active();
        let crossing_due = !crossing && self.pedestrian.is_due(now, self.timings.ped_wait_limit);
        let may_hand_off = !crossing && !crossing_due;

        for id in JunctionId::ALL {
            self.evaluate_junction(id, now, may_hand_off);
        }
        if may_hand_off {
            self.check_starvation(now);
        }
        if crossing_due {
            self.preempt_for_crossing(now);
        }

        debug_assert!(self.green_phases().len() <= 1, "conflicting greens");
        self.state()
    }

    /// Applies an operator command as if it arrived on the remote link.
    pub fn apply_command(&mut self, command: RemoteCommand) {
        let now = self.clock.now();
        self.apply_command_at(command, now);
    }

    fn poll_remote(&mut self, now: Duration) {
        while let Some(command) = self.remote.next_command() {
            self.apply_command_at(command, now);
        }
    }

    fn apply_command_at(&mut self, command: RemoteCommand, now: Duration) {
        if self.emergency_stopped != (command == RemoteCommand::Resume) {
            // Stopped: only resume counts. Running: resume means nothing.
            log::debug!("Ignoring remote command {:?}", command);
            return;
        }
        record(&mut self.events, now, ArbiterEvent::Command(command));
        match command {
            RemoteCommand::TriggerJunctionOne => {
                self.junctions[0].request(PendingChange::RemoteTriggered)
            }
            RemoteCommand::TriggerJunctionTwo => {
                self.junctions[1].request(PendingChange::RemoteTriggered)
            }
            RemoteCommand::TriggerPedestrian => self.pedestrian.request_remote(),
            RemoteCommand::Recalibrate => {
                for junction in self.junctions.iter_mut() {
                    let baseline = junction.recalibrate();
                    record(
                        &mut self.events,
                        now,
                        ArbiterEvent::Recalibrated {
                            junction: junction.id,
                            baseline,
                        },
                    );
                }
            }
            RemoteCommand::EmergencyStop => self.emergency_stop(now),
            RemoteCommand::Resume => self.resume(now),
        }
        self.remote.acknowledge(command);
    }

    fn evaluate_junction(&mut self, id: JunctionId, now: Duration, may_hand_off: bool) {
        let timings = self.timings;
        let (junction, rival) = pair_mut(&mut self.junctions, id);
        let waiting = junction.is_vehicle_waiting(now);

        if junction.is_green() {
            // Already has right-of-way: an operator request is satisfied.
            junction.clear_pending();
        } else if waiting || junction.pending().is_pending() || self.transition_target == Some(id) {
            if waiting {
                if !junction.pending().is_pending() {
                    log::info!("{}: vehicle waiting", junction.name);
                    record(&mut self.events, now, ArbiterEvent::VehicleWaiting(id));
                }
                junction.request(PendingChange::VehicleTriggered);
            }

            // A handoff in progress belongs to its target; the side that
            // just yielded waits for its own turn.
            let locked = self.transition_target;
            if may_hand_off && locked.map_or(true, |target| target == id) {
                if locked.is_none() {
                    let reason = if junction.pending() == PendingChange::RemoteTriggered {
                        Some(HandoffReason::RemoteOverride)
                    } else if self.safe_passage_timer.elapsed(now) > timings.safe_passage_time {
                        Some(HandoffReason::SafePassageElapsed)
                    } else if rival.surplus_exhausted() {
                        Some(HandoffReason::SurplusExhausted)
                    } else {
                        None
                    };

                    match reason {
                        Some(reason) => {
                            let forced_red = rival.change_red();
                            if forced_red {
                                record(
                                    &mut self.events,
                                    now,
                                    ArbiterEvent::PhaseRed(Phase::Junction(rival.id)),
                                );
                            }
                            // The all-red interval is measured from the latest red.
                            if forced_red || !self.transition_timer.is_running() {
                                self.transition_timer.restart(now);
                            }
                            self.transition_target = Some(id);
                            record(
                                &mut self.events,
                                now,
                                ArbiterEvent::HandoffStarted { to: id, reason },
                            );
                        }
                        None => {
                            if !self.safe_passage_timer.is_running() {
                                self.safe_passage_timer.start(now);
                            }
                        }
                    }
                }

                if self.transition_target == Some(id)
                    && self.transition_timer.elapsed(now) > timings.transition_time
                    && !rival.is_green()
                    && !self.pedestrian.is_green()
                {
                    junction.change_green();
                    record(&mut self.events, now, ArbiterEvent::PhaseGreen(Phase::Junction(id)));
                    junction.clear_pending();
                    self.transition_target = None;
                    self.transition_timer.reset();
                    self.safe_passage_timer.restart(now);
                    self.starvation_timer.restart(now);
                    rival.stop_vehicle_counter();
                }
            }
        }

        // While the rival holds green and this side waits, count what the
        // rival lets through so it can be cut off.
        if rival.is_green() && junction.pending().is_pending() && !rival.vehicle_counter_active() {
            rival.start_vehicle_counter();
            record(&mut self.events, now, ArbiterEvent::FairnessCounterArmed(rival.id));
        }
    }

    fn check_starvation(&mut self, now: Duration) {
        let Some(holder) = JunctionId::ALL
            .into_iter()
            .find(|id| self.junctions[id.index()].is_green())
        else {
            return;
        };
        let secondary = holder.other();
        self.starvation_timer.start(now);
        if self.starvation_timer.elapsed(now) > self.timings.starvation_time {
            let junction = &mut self.junctions[secondary.index()];
            log::warn!(
                "{}: no green for {:.1}s, forcing a change",
                junction.name,
                self.timings.starvation_time.as_secs_f64()
            );
            junction.request(PendingChange::RemoteTriggered);
            record(&mut self.events, now, ArbiterEvent::StarvationFallback(secondary));
            self.starvation_timer.restart(now);
        }
    }

    fn preempt_for_crossing(&mut self, now: Duration) {
        let mut forced_red = false;
        for junction in self.junctions.iter_mut() {
            if junction.change_red() {
                record(
                    &mut self.events,
                    now,
                    ArbiterEvent::PhaseRed(Phase::Junction(junction.id)),
                );
                forced_red = true;
            }
            junction.stop_vehicle_counter();
        }
        // The crossing takes over any junction handoff in progress.
        let took_over = self.transition_target.take().is_some();
        let restart = forced_red || !self.transition_timer.is_running();
        if restart {
            self.transition_timer.restart(now);
        }
        if restart || took_over {
            record(&mut self.events, now, ArbiterEvent::PedestrianPreemption);
        }
        self.safe_passage_timer.reset();

        if self.transition_timer.elapsed(now) > self.timings.transition_time {
            if self.pedestrian.remote_requested() {
                log::info!("Crossing green on operator request");
            } else {
                log::info!(
                    "Crossing green after {:.1}s wait",
                    self.pedestrian.waiting_time(now).as_secs_f64()
                );
            }
            self.pedestrian.change_green(now);
            record(&mut self.events, now, ArbiterEvent::PhaseGreen(Phase::Pedestrian));
            if let Some(digit) = self.pedestrian.current_digit() {
                record(&mut self.events, now, ArbiterEvent::CountdownDigit(digit));
            }
            self.transition_timer.reset();
        }
    }

    fn advance_crossing(&mut self, now: Duration) {
        let before = self.pedestrian.current_digit();
        match self.pedestrian.advance(now) {
            CountdownStatus::Running(digit) => {
                if before != Some(digit) {
                    record(&mut self.events, now, ArbiterEvent::CountdownDigit(digit));
                }
            }
            CountdownStatus::Finished => self.finish_crossing(now),
            CountdownStatus::Idle => {}
        }
    }

    /// The crossing always hands right-of-way back to J1.
    fn finish_crossing(&mut self, now: Duration) {
        record(&mut self.events, now, ArbiterEvent::PhaseRed(Phase::Pedestrian));
        record(&mut self.events, now, ArbiterEvent::CrossingFinished);

        let (one, two) = pair_mut(&mut self.junctions, JunctionId::One);
        if two.change_red() {
            record(&mut self.events, now, ArbiterEvent::PhaseRed(Phase::Junction(two.id)));
        }
        if one.change_green() {
            record(&mut self.events, now, ArbiterEvent::PhaseGreen(Phase::Junction(one.id)));
        }
        one.clear_pending();
        self.transition_target = None;
        self.transition_timer.reset();
        self.safe_passage_timer.restart(now);
        self.starvation_timer.restart(now);
    }

    fn emergency_stop(&mut self, now: Duration) {
        for junction in self.junctions.iter_mut() {
            if junction.is_green() {
                record(
                    &mut self.events,
                    now,
                    ArbiterEvent::PhaseRed(Phase::Junction(junction.id)),
                );
            }
            junction.halt();
        }
        if self.pedestrian.is_green() {
            record(&mut self.events, now, ArbiterEvent::PhaseRed(Phase::Pedestrian));
        }
        self.pedestrian.halt();
        self.safe_passage_timer.reset();
        self.transition_timer.reset();
        self.starvation_timer.reset();
        self.transition_target = None;
        self.emergency_stopped = true;
        log::warn!("Emergency stop: all signals red, arbitration suspended");
        record(&mut self.events, now, ArbiterEvent::EmergencyStop);
    }

    /// Leaves the stopped state. J1 gets green back only after a full
    /// transition interval.
    fn resume(&mut self, now: Duration) {
        self.emergency_stopped = false;
        self.junctions[JunctionId::One.index()].request(PendingChange::RemoteTriggered);
        self.starvation_timer.restart(now);
        log::warn!("Resuming arbitration");
        record(&mut self.events, now, ArbiterEvent::Resumed);
    }
}

/// Drives the arbiter at a fixed tick until `shutdown` resolves, handing
/// every batch of events to `sink`. Returns the arbiter for inspection.
pub async fn run_control_loop<S, F>(
    mut arbiter: IntersectionArbiter,
    tick_interval: Duration,
    mut sink: S,
    shutdown: F,
) -> Result<IntersectionArbiter, EventLogError>
where
    S: EventSink,
    F: Future<Output = ()>,
{
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                arbiter.tick();
                let events = arbiter.drain_events();
                if !events.is_empty() {
                    sink.record(&events)?;
                }
            }
        }
    }
    log::info!("Control loop stopped");
    Ok(arbiter)
}
