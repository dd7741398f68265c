//! Application-wide defaults and limits.

// # Positions and angles

/// Fully closed, slats tilted down.
pub const MINIMUM_POSITION: i32 = -100;
/// Fully closed, slats tilted up.
pub const MAXIMUM_POSITION: i32 = 100;
/// Position used by `DARK`.
pub const DARK_POSITION: i32 = -100;
/// Degrees of tilt per percent of position.
pub const ANGLE_SCALE: f64 = 0.9;
/// Solar elevation range accepted from the solar-angle provider.
pub const MAXIMUM_SOLAR_ANGLE: f64 = 90.0;

// # Heat management heuristics

/// Temperature difference (°C) separating warm/hot and cool/cold.
pub const TEMPERATURE_BAND_EDGE: f64 = 6.0;
pub const DEFAULT_DESIRED_TEMP: f64 = 22.0;
pub const MINIMUM_DESIRED_TEMP: f64 = 5.0;
pub const MAXIMUM_DESIRED_TEMP: f64 = 35.0;

// # Tick loop

/// Seconds between resolution passes.
pub const DEFAULT_TICK_INTERVAL: u64 = 60;
pub const MINIMUM_TICK_INTERVAL: u64 = 10;
pub const MAXIMUM_TICK_INTERVAL: u64 = 3600;

// # Motor

pub const DEFAULT_MICROSTEP: &str = "full";
pub const DEFAULT_BACKLASH_CORRECTION: f64 = 1.0;
pub const MINIMUM_BACKLASH_CORRECTION: f64 = 0.5;
pub const MAXIMUM_BACKLASH_CORRECTION: f64 = 2.0;
/// Degrees per full step of a 200-step motor.
pub const FULL_STEP_DEGREES: f64 = 1.8;

// # Collaborator fallbacks

pub const DEFAULT_INTERNAL_TEMP: f64 = 22.0;
pub const DEFAULT_EXTERNAL_TEMP: f64 = 22.0;
pub const DEFAULT_CLOUD_COVER: f64 = 0.0;
pub const MINIMUM_SENSOR_TEMP: f64 = -60.0;
pub const MAXIMUM_SENSOR_TEMP: f64 = 70.0;

// # Files

pub const CONFIG_FILE_NAME: &str = "tiltr.toml";
pub const DEFAULT_SCHEDULE_FILE: &str = "schedule.json";
pub const DEFAULT_MODE: &str = "DARK";
pub const DEFAULT_WATCH_SCHEDULE: bool = true;
/// Quiet period before a schedule file change triggers a reload.
pub const WATCH_DEBOUNCE_MS: u64 = 500;
pub const ANGLE_FILE_NAME: &str = "angle";
pub const OVERRIDE_FILE_NAME: &str = "override.json";
pub const REQUEST_FILE_NAME: &str = "request.json";

// # Exit codes

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
