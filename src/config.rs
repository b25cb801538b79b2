use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::global_variables::{
    JUNCTION_ONE_NAME, JUNCTION_TWO_NAME, PED_WAIT_LIMIT, SAFE_PASSAGE_TIME, SENSOR_SENSITIVITY,
    STARVATION_TIME, SURPLUS_VEHICLE_LIMIT, TICK_INTERVAL_MS, TRANSITION_TIME, WAIT_LIMIT,
};

/// Per-junction tunables. Only `name` is required when a junction is overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JunctionConfig {
    /// Name of the junction, used for monitoring only.
    pub name: String,
    /// Seconds a vehicle must be continuously detected before it counts as waiting.
    #[serde(default = "default_wait_limit")]
    pub wait_limit: f64,
    /// Vehicles allowed through while the other junction waits before this one must yield.
    #[serde(default = "default_surplus_vehicle_limit")]
    pub surplus_vehicle_limit: u32,
    /// Presence threshold applied to the baseline-corrected reflectance reading.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
}

fn default_wait_limit() -> f64 {
    WAIT_LIMIT
}

fn default_surplus_vehicle_limit() -> u32 {
    SURPLUS_VEHICLE_LIMIT
}

fn default_sensitivity() -> f32 {
    SENSOR_SENSITIVITY
}

impl JunctionConfig {
    pub fn junction_one() -> Self {
        Self {
            name: JUNCTION_ONE_NAME.to_string(),
            wait_limit: WAIT_LIMIT,
            surplus_vehicle_limit: SURPLUS_VEHICLE_LIMIT,
            sensitivity: SENSOR_SENSITIVITY,
        }
    }

    pub fn junction_two() -> Self {
        Self {
            name: JUNCTION_TWO_NAME.to_string(),
            wait_limit: WAIT_LIMIT,
            surplus_vehicle_limit: SURPLUS_VEHICLE_LIMIT,
            sensitivity: SENSOR_SENSITIVITY,
        }
    }

    pub fn wait_limit(&self) -> Duration {
        Duration::from_secs_f64(self.wait_limit)
    }
}

/// Arbitration timings and junction settings. Timings are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub tick_interval_ms: u64,
    pub safe_passage_time: f64,
    pub transition_time: f64,
    pub ped_wait_limit: f64,
    pub starvation_time: f64,
    pub junction_one: JunctionConfig,
    pub junction_two: JunctionConfig,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            safe_passage_time: SAFE_PASSAGE_TIME,
            transition_time: TRANSITION_TIME,
            ped_wait_limit: PED_WAIT_LIMIT,
            starvation_time: STARVATION_TIME,
            junction_one: JunctionConfig::junction_one(),
            junction_two: JunctionConfig::junction_two(),
        }
    }
}

impl ArbiterConfig {
    /// Parses a JSON document. Missing fields fall back to the defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ArbiterConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        check_seconds("safe_passage_time", self.safe_passage_time)?;
        check_seconds("transition_time", self.transition_time)?;
        check_seconds("ped_wait_limit", self.ped_wait_limit)?;
        check_seconds("starvation_time", self.starvation_time)?;
        if self.transition_time >= self.starvation_time {
            return Err(ConfigError::Invalid {
                field: "transition_time",
                reason: format!(
                    "{} s must be shorter than starvation_time ({} s)",
                    self.transition_time, self.starvation_time
                ),
            });
        }
        for junction in [&self.junction_one, &self.junction_two] {
            check_seconds("wait_limit", junction.wait_limit)?;
            if !(0.0..=1.0).contains(&junction.sensitivity) {
                return Err(ConfigError::Invalid {
                    field: "sensitivity",
                    reason: format!("{}: {} is outside 0..=1", junction.name, junction.sensitivity),
                });
            }
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn timings(&self) -> ArbiterTimings {
        ArbiterTimings {
            safe_passage_time: Duration::from_secs_f64(self.safe_passage_time),
            transition_time: Duration::from_secs_f64(self.transition_time),
            ped_wait_limit: Duration::from_secs_f64(self.ped_wait_limit),
            starvation_time: Duration::from_secs_f64(self.starvation_time),
        }
    }
}

fn check_seconds(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{} is not a positive number of seconds", value),
        })
    }
}

/// The arbiter's timings converted once into durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterTimings {
    pub safe_passage_time: Duration,
    pub transition_time: Duration,
    pub ped_wait_limit: Duration,
    pub starvation_time: Duration,
}
