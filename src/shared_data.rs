// src/shared_data.rs

use crate::control_system::remote::RemoteCommand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One of the two directional approaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JunctionId {
    One,
    Two,
}

impl JunctionId {
    pub const ALL: [JunctionId; 2] = [JunctionId::One, JunctionId::Two];

    pub fn other(self) -> Self {
        match self {
            JunctionId::One => JunctionId::Two,
            JunctionId::Two => JunctionId::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            JunctionId::One => 0,
            JunctionId::Two => 1,
        }
    }
}

impl fmt::Display for JunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JunctionId::One => write!(f, "J1"),
            JunctionId::Two => write!(f, "J2"),
        }
    }
}

/// Anything that can hold right-of-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Junction(JunctionId),
    Pedestrian,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Junction(id) => write!(f, "{}", id),
            Phase::Pedestrian => write!(f, "PED"),
        }
    }
}

/// Why the currently green junction was asked to yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandoffReason {
    SafePassageElapsed,
    SurplusExhausted,
    RemoteOverride,
}

/// Observable decisions taken by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArbiterEvent {
    Started,
    PhaseGreen(Phase),
    PhaseRed(Phase),
    VehicleWaiting(JunctionId),
    FairnessCounterArmed(JunctionId),
    HandoffStarted { to: JunctionId, reason: HandoffReason },
    StarvationFallback(JunctionId),
    PedestrianRequested,
    PedestrianPreemption,
    CountdownDigit(u8),
    CrossingFinished,
    Recalibrated { junction: JunctionId, baseline: f32 },
    Command(RemoteCommand),
    EmergencyStop,
    Resumed,
}

impl ArbiterEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ArbiterEvent::Started => "started",
            ArbiterEvent::PhaseGreen(_) => "phase_green",
            ArbiterEvent::PhaseRed(_) => "phase_red",
            ArbiterEvent::VehicleWaiting(_) => "vehicle_waiting",
            ArbiterEvent::FairnessCounterArmed(_) => "fairness_counter_armed",
            ArbiterEvent::HandoffStarted { .. } => "handoff_started",
            ArbiterEvent::StarvationFallback(_) => "starvation_fallback",
            ArbiterEvent::PedestrianRequested => "pedestrian_requested",
            ArbiterEvent::PedestrianPreemption => "pedestrian_preemption",
            ArbiterEvent::CountdownDigit(_) => "countdown_digit",
            ArbiterEvent::CrossingFinished => "crossing_finished",
            ArbiterEvent::Recalibrated { .. } => "recalibrated",
            ArbiterEvent::Command(_) => "remote_command",
            ArbiterEvent::EmergencyStop => "emergency_stop",
            ArbiterEvent::Resumed => "resumed",
        }
    }
}

impl fmt::Display for ArbiterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArbiterEvent::Started => write!(f, "J1 green, J2 red, crossing red"),
            ArbiterEvent::PhaseGreen(phase) => write!(f, "{} green", phase),
            ArbiterEvent::PhaseRed(phase) => write!(f, "{} red", phase),
            ArbiterEvent::VehicleWaiting(id) => write!(f, "vehicle waiting at {}", id),
            ArbiterEvent::FairnessCounterArmed(id) => {
                write!(f, "counting surplus vehicles through {}", id)
            }
            ArbiterEvent::HandoffStarted { to, reason } => {
                write!(f, "handing off to {} ({:?})", to, reason)
            }
            ArbiterEvent::StarvationFallback(id) => write!(f, "{} starved, forcing request", id),
            ArbiterEvent::PedestrianRequested => write!(f, "crossing requested"),
            ArbiterEvent::PedestrianPreemption => write!(f, "crossing preempts traffic"),
            ArbiterEvent::CountdownDigit(digit) => write!(f, "countdown {}", digit),
            ArbiterEvent::CrossingFinished => write!(f, "crossing finished"),
            ArbiterEvent::Recalibrated { junction, baseline } => {
                write!(f, "{} sensor baseline {:.3}", junction, baseline)
            }
            ArbiterEvent::Command(command) => {
                write!(f, "remote command '{}' ({:?})", command.as_byte() as char, command)
            }
            ArbiterEvent::EmergencyStop => write!(f, "emergency stop"),
            ArbiterEvent::Resumed => write!(f, "resumed"),
        }
    }
}

/// An event stamped with the arbiter clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub at: Duration,
    pub event: ArbiterEvent,
}

/// Flat, CSV-friendly form of a [`TimedEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: u64,
    pub elapsed_ms: u64,
    pub kind: String,
    pub detail: String,
}

impl EventRecord {
    pub fn from_event(timed: &TimedEvent, timestamp: u64) -> Self {
        Self {
            timestamp,
            elapsed_ms: timed.at.as_millis() as u64,
            kind: timed.event.kind().to_string(),
            detail: timed.event.to_string(),
        }
    }
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
