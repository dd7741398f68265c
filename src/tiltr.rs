//! Daemon startup: load configuration and state, build the collaborators, run the loop.
//!
//! ```no_run
//! use tiltr::Tiltr;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Normal daemon start
//! Tiltr::new(false).run()?;
//!
//! // Simulation: no lock and no writes, so a real daemon can keep running alongside
//! Tiltr::new(false)
//!     .without_lock()
//!     .without_headers()
//!     .in_memory()
//!     .run()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};

use crate::common::constants::{
    DEFAULT_CLOUD_COVER, DEFAULT_EXTERNAL_TEMP, DEFAULT_INTERNAL_TEMP,
};
use crate::common::utils::private_path;
use crate::config::watcher::ScheduleWatcher;
use crate::config::{self, Config};
use crate::control::policy::ModePolicy;
use crate::core::{Controller, ControllerParts, Core, CoreParams};
use crate::geo::{SolarPosition, UnknownLocation, daylight_window};
use crate::io::lock::{acquire_lock, lock_path};
use crate::io::signals::setup_signal_handler;
use crate::logger::Log;
use crate::motor::{AngleStepMapper, DryRunDriver};
use crate::schedule::BlindMode;
use crate::sensors::{
    FileTemperatureSensor, FileWeatherSource, FixedTemperature, FixedWeather, SolarAngleSource,
    TemperatureSensor, Weather, WeatherSource,
};
use crate::state::angle::{AngleStore, FileAngleStore, MemoryAngleStore};
use crate::state::{self, StatePaths};

pub struct Tiltr {
    debug_enabled: bool,
    create_lock: bool,
    show_headers: bool,
    persist_state: bool,
}

impl Tiltr {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            show_headers: true,
            persist_state: true,
        }
    }

    /// Skip the single-instance lock (simulation).
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Start from the persisted angle and override but never write them back.
    pub fn in_memory(mut self) -> Self {
        self.persist_state = false;
        self
    }

    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Debug mode enabled - logging every motor command");
            }
        }

        let custom_dir = config::get_custom_config_dir();
        if let Some(dir) = &custom_dir {
            log_block_start!("Base directory: {}", private_path(dir));
        }

        let lock = if self.create_lock {
            Some(acquire_lock(&lock_path(custom_dir.as_deref()))?)
        } else {
            None
        };

        let config = config::load()?;
        config.log_config();

        let paths = StatePaths::current()?;
        let schedule_path = config.schedule_path(&config::get_config_base_dir()?);
        let fallback_mode = BlindMode::from_parts(config.default_mode(), config.default_position)
            .context("Invalid default_mode in configuration")?;

        let schedule = state::load_schedule(&schedule_path, fallback_mode, config.timezone())?;
        Log::set_schedule_timezone(schedule.timezone());
        log_block_start!(
            "Schedule: {} (default {})",
            private_path(&schedule_path),
            schedule.default_mode()
        );
        if schedule.is_empty() {
            log_indented!("No time blocks; the default applies all week");
        }

        let active_override = match state::load_override(&paths) {
            Ok(active) => active,
            Err(e) => {
                log_warning!("Ignoring saved override: {e:#}");
                None
            }
        };
        if let Some(active) = &active_override {
            log_indented!("Restored override {} from {}", active.block, active.date);
        }

        self.log_daylight(&config);

        let controller = Controller::new(ControllerParts {
            schedule,
            active_override,
            policy: build_policy(&config),
            mapper: AngleStepMapper::new(self.angle_store(&paths), config.backlash_correction()),
            driver: Box::new(DryRunDriver::new(self.debug_enabled)),
            resolution: config.microstep()?,
            state: self.persist_state.then(|| paths.clone()),
        })?;

        let signal_state = setup_signal_handler(self.debug_enabled)?;
        if self.persist_state && config.watch_schedule() {
            let watcher = ScheduleWatcher::new(
                signal_state.signal_sender.clone(),
                schedule_path.clone(),
                self.debug_enabled,
            );
            if let Err(e) = watcher.start() {
                log_warning!("Schedule hot reload unavailable: {e:#}");
                log_indented!("Use `tiltr reload` after editing the schedule");
            }
        }

        Core::new(CoreParams {
            controller,
            signal_state,
            tick_interval: Duration::from_secs(config.tick_interval()),
            schedule_path,
            fallback_mode,
            fallback_timezone: config.timezone(),
            state: paths,
            lock,
        })
        .execute()?;

        Ok(())
    }

    fn angle_store(&self, paths: &StatePaths) -> Box<dyn AngleStore> {
        let store = FileAngleStore::new(paths.angle());
        if self.persist_state {
            return Box::new(store);
        }
        let start = if store.path().exists() {
            store.clone().get().unwrap_or(0.0)
        } else {
            0.0
        };
        Box::new(MemoryAngleStore::new(start))
    }

    fn log_daylight(&self, config: &Config) {
        let Some((lat, lon)) = config.coordinates() else {
            return;
        };
        let today = crate::time::source::now().date_naive();
        if let Some(window) = daylight_window(lat, lon, today) {
            let tz = config.timezone();
            let show = |t: chrono::DateTime<chrono::Utc>| match tz {
                Some(tz) => t.with_timezone(&tz).format("%H:%M").to_string(),
                None => t.with_timezone(&chrono::Local).format("%H:%M").to_string(),
            };
            log_indented!(
                "Daylight today: {} to {}",
                show(window.sunrise),
                show(window.sunset)
            );
        }
    }
}

/// Mode policy wired to the configured location, weather and temperature sources.
pub fn build_policy(config: &Config) -> ModePolicy {
    let solar: Box<dyn SolarAngleSource> = match config.coordinates() {
        Some((lat, lon)) => Box::new(SolarPosition::new(lat, lon)),
        None => Box::new(UnknownLocation),
    };
    let weather: Box<dyn WeatherSource> = match &config.weather_file {
        Some(path) => Box::new(FileWeatherSource::new(path)),
        None => Box::new(FixedWeather::new(Weather {
            cloud_cover: config.cloud_cover.unwrap_or(DEFAULT_CLOUD_COVER),
            external_temp: config.external_temp.unwrap_or(DEFAULT_EXTERNAL_TEMP),
        })),
    };
    let temperature: Box<dyn TemperatureSensor> = match &config.temperature_sensor {
        Some(path) => Box::new(FileTemperatureSensor::new(path)),
        None => Box::new(FixedTemperature::new(
            config.internal_temp.unwrap_or(DEFAULT_INTERNAL_TEMP),
        )),
    };
    ModePolicy::new(solar, weather, temperature, config.desired_temp())
}
