//! Sensor collaborators consulted by the mode policy.
//!
//! Acquisition is deliberately thin: readings come from fixed configuration
//! values or from files that some other process keeps fresh (a 1-wire sysfs
//! node, a JSON weather dump written by a cron job). The policy validates
//! ranges; these only read and parse.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::common::constants::{MAXIMUM_SENSOR_TEMP, MINIMUM_SENSOR_TEMP};
use crate::common::utils::private_path;

/// Indoor temperature in °C.
pub trait TemperatureSensor: Send {
    fn sample(&mut self) -> Result<f64>;
}

/// Outdoor conditions.
pub trait WeatherSource: Send {
    fn conditions(&mut self) -> Result<Weather>;
}

/// Solar elevation in degrees at an instant.
pub trait SolarAngleSource: Send {
    fn angle(&self, at: DateTime<Utc>) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Weather {
    /// Percent of sky covered, `[0, 100]`.
    pub cloud_cover: f64,
    /// Outdoor temperature in °C.
    pub external_temp: f64,
}

/// A temperature that never changes.
pub struct FixedTemperature(f64);

impl FixedTemperature {
    pub fn new(celsius: f64) -> Self {
        Self(celsius)
    }
}

impl TemperatureSensor for FixedTemperature {
    fn sample(&mut self) -> Result<f64> {
        Ok(self.0)
    }
}

/// Reads a temperature file such as `/sys/bus/w1/devices/28-*/temperature`.
///
/// Integer contents are millidegrees (the kernel's convention); anything with a
/// decimal point is taken as degrees.
pub struct FileTemperatureSensor {
    path: PathBuf,
}

impl FileTemperatureSensor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn parse_temperature(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    let celsius = if raw.contains('.') {
        raw.parse::<f64>()?
    } else {
        raw.parse::<i64>()? as f64 / 1000.0
    };
    if !(MINIMUM_SENSOR_TEMP..=MAXIMUM_SENSOR_TEMP).contains(&celsius) {
        bail!("temperature reading {celsius}°C is implausible");
    }
    Ok(celsius)
}

impl TemperatureSensor for FileTemperatureSensor {
    fn sample(&mut self) -> Result<f64> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", private_path(&self.path)))?;
        parse_temperature(&raw)
            .with_context(|| format!("Bad temperature in {}", private_path(&self.path)))
    }
}

/// Weather that never changes.
pub struct FixedWeather(Weather);

impl FixedWeather {
    pub fn new(weather: Weather) -> Self {
        Self(weather)
    }
}

impl WeatherSource for FixedWeather {
    fn conditions(&mut self) -> Result<Weather> {
        Ok(self.0)
    }
}

/// Reads `{"cloud_cover": .., "external_temp": ..}` from a file on every call.
pub struct FileWeatherSource {
    path: PathBuf,
}

impl FileWeatherSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WeatherSource for FileWeatherSource {
    fn conditions(&mut self) -> Result<Weather> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", private_path(&self.path)))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse weather from {}", private_path(&self.path)))
    }
}
