// Default tunables. Every value can be overridden through the JSON config.

// Control loop
pub const TICK_INTERVAL_MS: u64 = 100;

// Arbitration timings (seconds)
pub const SAFE_PASSAGE_TIME: f64 = 10.0;
pub const TRANSITION_TIME: f64 = 2.0;
pub const PED_WAIT_LIMIT: f64 = 5.0;
pub const STARVATION_TIME: f64 = 60.0;

// Junctions
pub const JUNCTION_ONE_NAME: &str = "Junction 1";
pub const JUNCTION_TWO_NAME: &str = "Junction 2";
/// Seconds of continuous presence before a vehicle counts as waiting, both approaches.
pub const WAIT_LIMIT: f64 = 0.5;

// Shared sensing / fairness
pub const SURPLUS_VEHICLE_LIMIT: u32 = 3;
pub const SENSOR_SENSITIVITY: f32 = 0.3;

// Pedestrian countdown: digits shown from COUNTDOWN_START down to 0, one per step.
pub const COUNTDOWN_START: u8 = 9;
pub const COUNTDOWN_STEP_SECS: u64 = 1;
