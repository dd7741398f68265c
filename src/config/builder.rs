//! Writing the commented default `tiltr.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Create `path` (and its directory) with every setting documented.
///
/// Settings without a sensible universal default (location, sensor paths,
/// timezone) are written commented out.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    let content = default_config_content();
    fs::write(path, content)
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))
}

pub(crate) fn default_config_content() -> String {
    ConfigBuilder::new()
        .add_section("Controller")
        .add_setting(
            "tick_interval",
            &DEFAULT_TICK_INTERVAL.to_string(),
            &format!(
                "Seconds between resolution passes ({MINIMUM_TICK_INTERVAL}-{MAXIMUM_TICK_INTERVAL})"
            ),
        )
        .add_disabled_setting(
            "timezone",
            "\"Europe/Berlin\"",
            "IANA zone for reading the schedule (default: system zone)",
        )
        .add_setting(
            "schedule_file",
            &format!("\"{DEFAULT_SCHEDULE_FILE}\""),
            "Weekly schedule, relative to this directory",
        )
        .add_setting(
            "default_mode",
            &format!("\"{DEFAULT_MODE}\""),
            "Used until a schedule is installed: LIGHT, DARK, ECO, BALANCED, MANUAL",
        )
        .add_setting(
            "watch_schedule",
            &DEFAULT_WATCH_SCHEDULE.to_string(),
            "Reload the schedule when its file changes",
        )
        .add_disabled_setting(
            "default_position",
            "0",
            "Position for a MANUAL default (-100 to 100)",
        )
        .add_section("Location")
        .add_disabled_setting("latitude", "51.05", "Needed by LIGHT, ECO and BALANCED")
        .add_disabled_setting("longitude", "-114.07", "Degrees east (negative is west)")
        .add_section("Climate")
        .add_setting(
            "desired_temp",
            &format!("{DEFAULT_DESIRED_TEMP:.1}"),
            &format!(
                "Target room temperature ({MINIMUM_DESIRED_TEMP}-{MAXIMUM_DESIRED_TEMP}) °C"
            ),
        )
        .add_disabled_setting(
            "temperature_sensor",
            "\"/sys/bus/w1/devices/28-000005e2fdc3/temperature\"",
            "Inside temperature file (°C or millidegrees)",
        )
        .add_setting(
            "internal_temp",
            &format!("{DEFAULT_INTERNAL_TEMP:.1}"),
            "Inside temperature when no sensor file is set",
        )
        .add_disabled_setting(
            "weather_file",
            "\"/run/weather/current.json\"",
            "JSON with cloud_cover and external_temp",
        )
        .add_setting(
            "cloud_cover",
            &format!("{DEFAULT_CLOUD_COVER:.1}"),
            "Cloud cover percent when no weather file is set",
        )
        .add_setting(
            "external_temp",
            &format!("{DEFAULT_EXTERNAL_TEMP:.1}"),
            "Outside temperature when no weather file is set",
        )
        .add_section("Motor")
        .add_setting(
            "microstep",
            &format!("\"{DEFAULT_MICROSTEP}\""),
            "Stepper resolution: full, half, quarter or eighth",
        )
        .add_setting(
            "backlash_correction",
            &format!("{DEFAULT_BACKLASH_CORRECTION:.1}"),
            &format!(
                "Step count multiplier ({MINIMUM_BACKLASH_CORRECTION}-{MAXIMUM_BACKLASH_CORRECTION})"
            ),
        )
        .build()
}

struct ConfigBuilder {
    entries: Vec<Entry>,
}

enum Entry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(Entry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    /// A setting written commented out, as an example.
    fn add_disabled_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(Entry::Setting {
            line: format!("#{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Setting { line, .. } => Some(line.len()),
                Entry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut lines = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Section(title) => {
                    if !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(title);
                }
                Entry::Setting { line, comment } => {
                    let padding = " ".repeat(width - line.len());
                    lines.push(format!("{line}{padding}{comment}"));
                }
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }
}
