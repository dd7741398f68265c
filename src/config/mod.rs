//! Configuration for the tiltr daemon.
//!
//! Settings live in `tiltr.toml` under `$XDG_CONFIG_HOME/tiltr/` (or the
//! directory given with `--config`). A commented default file is written the
//! first time tiltr starts without one.
//!
//! ```toml
//! #[Controller]
//! tick_interval = 60            # Seconds between resolution passes (10-3600)
//! timezone = "America/Edmonton" # IANA zone used to read the schedule
//! schedule_file = "schedule.json"
//! default_mode = "DARK"         # Used when no schedule file exists
//! watch_schedule = true         # Reload when schedule.json changes
//!
//! #[Location]
//! latitude = 51.05
//! longitude = -114.07
//!
//! #[Climate]
//! desired_temp = 22
//! temperature_sensor = "/sys/bus/w1/devices/28-000005e2fdc3/temperature"
//! weather_file = "/run/weather/current.json"
//!
//! #[Motor]
//! microstep = "full"            # full, half, quarter or eighth
//! backlash_correction = 1.0     # Step count multiplier (0.5-2.0)
//! ```
//!
//! Every field is optional; the accessors below fall back to the defaults in
//! [`crate::common::constants`].

pub mod builder;
pub mod loading;
pub mod validation;
pub mod watcher;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::common::constants::*;
use crate::motor::MicrostepResolution;

pub use builder::create_default_config;
pub use loading::{
    get_config_base_dir, get_config_path, get_custom_config_dir, load, load_from_path,
    set_config_dir,
};

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub tick_interval: Option<u64>,
    pub timezone: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub desired_temp: Option<f64>,
    /// File holding the inside temperature (°C, or millidegrees as an integer).
    pub temperature_sensor: Option<PathBuf>,
    /// Fixed inside temperature when no sensor file is configured.
    pub internal_temp: Option<f64>,
    /// JSON file with `cloud_cover` and `external_temp`, refreshed by an outside job.
    pub weather_file: Option<PathBuf>,
    pub cloud_cover: Option<f64>,
    pub external_temp: Option<f64>,

    pub microstep: Option<String>,
    pub backlash_correction: Option<f64>,

    /// Relative paths are resolved against the config directory.
    pub schedule_file: Option<PathBuf>,
    pub default_mode: Option<String>,
    pub default_position: Option<i64>,
    /// Reload the schedule as soon as its file changes on disk.
    pub watch_schedule: Option<bool>,
}

impl Config {
    pub fn tick_interval(&self) -> u64 {
        self.tick_interval.unwrap_or(DEFAULT_TICK_INTERVAL)
    }

    /// The configured zone. Validation has already rejected unknown names.
    pub fn timezone(&self) -> Option<Tz> {
        self.timezone.as_deref().and_then(|name| name.parse().ok())
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    pub fn desired_temp(&self) -> f64 {
        self.desired_temp.unwrap_or(DEFAULT_DESIRED_TEMP)
    }

    pub fn microstep(&self) -> Result<MicrostepResolution> {
        self.microstep.as_deref().unwrap_or(DEFAULT_MICROSTEP).parse()
    }

    pub fn backlash_correction(&self) -> f64 {
        self.backlash_correction
            .unwrap_or(DEFAULT_BACKLASH_CORRECTION)
    }

    pub fn default_mode(&self) -> &str {
        self.default_mode.as_deref().unwrap_or(DEFAULT_MODE)
    }

    pub fn watch_schedule(&self) -> bool {
        self.watch_schedule.unwrap_or(DEFAULT_WATCH_SCHEDULE)
    }

    /// Absolute schedule path, resolving a relative one against `config_dir`.
    pub fn schedule_path(&self, config_dir: &Path) -> PathBuf {
        let file = self
            .schedule_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEDULE_FILE));
        if file.is_absolute() {
            file
        } else {
            config_dir.join(file)
        }
    }

    pub fn log_config(&self) {
        log_block_start!("Loaded configuration");
        log_indented!("Tick interval: {} seconds", self.tick_interval());
        match self.timezone() {
            Some(tz) => log_indented!("Timezone: {}", tz.name()),
            None => log_indented!("Timezone: system local time"),
        }
        match self.coordinates() {
            Some((lat, lon)) => {
                let lat_dir = if lat >= 0.0 { "N" } else { "S" };
                let lon_dir = if lon >= 0.0 { "E" } else { "W" };
                log_indented!(
                    "Location: {:.3}°{}, {:.3}°{}",
                    lat.abs(),
                    lat_dir,
                    lon.abs(),
                    lon_dir
                );
            }
            None => log_indented!("Location: not set (LIGHT, ECO and BALANCED unavailable)"),
        }
        log_indented!("Desired temperature: {}°C", self.desired_temp());
        if let Ok(resolution) = self.microstep() {
            log_indented!(
                "Motor: {} stepping, backlash correction {}",
                resolution,
                self.backlash_correction()
            );
        }
    }
}
