//! Mode policy: turns a [`BlindMode`] into a target position.
//!
//! `LIGHT` follows the sun, `DARK` closes, `MANUAL` holds its payload. `ECO`
//! and `BALANCED` use two empirical lookup tables that pick a slat angle from
//! how far the outside and inside temperatures sit from the desired one and
//! how cloudy it is. The tables are tuned by hand; keep the numbers as they are.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::common::constants::{
    ANGLE_SCALE, DARK_POSITION, MAXIMUM_POSITION, MAXIMUM_SOLAR_ANGLE, MINIMUM_POSITION,
    TEMPERATURE_BAND_EDGE,
};
use crate::error::{BlindsError, BlindsResult};
use crate::schedule::BlindMode;
use crate::sensors::{SolarAngleSource, TemperatureSensor, WeatherSource};

/// Signed temperature difference from the desired temperature, banded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureBand {
    Hot,
    Warm,
    Cool,
    Cold,
    Equilibrium,
}

impl TemperatureBand {
    pub fn classify(difference: f64) -> Self {
        if difference >= TEMPERATURE_BAND_EDGE {
            TemperatureBand::Hot
        } else if difference > 0.0 {
            TemperatureBand::Warm
        } else if difference <= -TEMPERATURE_BAND_EDGE {
            TemperatureBand::Cold
        } else if difference < 0.0 {
            TemperatureBand::Cool
        } else {
            TemperatureBand::Equilibrium
        }
    }
}

/// Cloud coverage in quarters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudBand {
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
}

impl CloudBand {
    pub fn classify(percent: f64) -> BlindsResult<Self> {
        match percent {
            p if (0.0..25.0).contains(&p) => Ok(CloudBand::Clear),
            p if (25.0..50.0).contains(&p) => Ok(CloudBand::PartlyCloudy),
            p if (50.0..75.0).contains(&p) => Ok(CloudBand::Cloudy),
            p if (75.0..=100.0).contains(&p) => Ok(CloudBand::Overcast),
            p => Err(BlindsError::InvalidCoverage(p)),
        }
    }
}

/// Angle from outside temperature and cloud cover. Zero when outside is at equilibrium.
fn cloud_angle(external: TemperatureBand, cloud: CloudBand) -> f64 {
    use CloudBand::*;
    use TemperatureBand::*;
    match (external, cloud) {
        (Hot, Clear) => 70.0,
        (Hot, PartlyCloudy) => 65.0,
        (Hot, Cloudy) => -30.0,
        (Hot, Overcast) => -25.0,
        (Warm, Clear) => 65.0,
        (Warm, PartlyCloudy) => 60.0,
        (Warm, Cloudy) => -35.0,
        (Warm, Overcast) => -30.0,
        (Cool, Clear) => -15.0,
        (Cool, PartlyCloudy) => -20.0,
        (Cool, Cloudy) => 41.0,
        (Cool, Overcast) => 46.0,
        (Cold, Clear) => -10.0,
        (Cold, PartlyCloudy) => -15.0,
        (Cold, Cloudy) => 46.0,
        (Cold, Overcast) => 51.0,
        (Equilibrium, _) => 0.0,
    }
}

/// Angle from outside vs inside temperature. Zero when inside is at equilibrium.
fn comfort_angle(external: TemperatureBand, actual: TemperatureBand) -> f64 {
    use TemperatureBand::*;
    match (external, actual) {
        (_, Equilibrium) => 0.0,
        (Hot, Hot) => 80.0,
        (Hot, Warm) => 75.0,
        (Hot, Cool) => -5.0,
        (Hot, Cold) => 0.0,
        (Warm, Hot) => 75.0,
        (Warm, Warm) => 70.0,
        (Warm, Cool) => -10.0,
        (Warm, Cold) => 0.0,
        (Cool, Hot) => 70.0,
        (Cool, Warm) => 65.0,
        (Cool, Cool) => -15.0,
        (Cool, Cold) => -10.0,
        (Cold, Hot) => 65.0,
        (Cold, Warm) => 60.0,
        (Cold, Cool) => -20.0,
        (Cold, Cold) => -15.0,
        (Equilibrium, Hot) => 70.0,
        (Equilibrium, Warm) => 70.0,
        (Equilibrium, Cool) => -10.0,
        (Equilibrium, Cold) => -10.0,
    }
}

/// Reject solar angles outside `[-90, 90]`.
pub fn check_solar_angle(angle: f64) -> BlindsResult<f64> {
    if (-MAXIMUM_SOLAR_ANGLE..=MAXIMUM_SOLAR_ANGLE).contains(&angle) {
        Ok(angle)
    } else {
        Err(BlindsError::InvalidSolarAngle(angle))
    }
}

/// Share of the sun-driven term: `max(0, angle) / 90`.
pub fn solar_weight(solar_angle: f64) -> f64 {
    solar_angle.max(0.0) / MAXIMUM_SOLAR_ANGLE
}

/// Slat angle that lets direct sunlight through.
pub fn light_angle(solar_angle: f64) -> BlindsResult<f64> {
    Ok(-check_solar_angle(solar_angle)?)
}

/// Readings the `ECO` heuristic works from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcoInputs {
    pub cloud_cover: f64,
    pub external_temp: f64,
    pub internal_temp: f64,
    pub desired_temp: f64,
}

/// `ECO` slat angle for the given solar weight.
pub fn eco_angle(inputs: &EcoInputs, weight: f64) -> BlindsResult<f64> {
    let cloud = CloudBand::classify(inputs.cloud_cover)?;
    let external = TemperatureBand::classify(inputs.external_temp - inputs.desired_temp);
    let actual = TemperatureBand::classify(inputs.internal_temp - inputs.desired_temp);

    let (sun_weight, temp_weight) = match (external, actual) {
        (TemperatureBand::Equilibrium, TemperatureBand::Equilibrium) => return Ok(0.0),
        (TemperatureBand::Equilibrium, _) => (0.0, 1.0),
        (_, TemperatureBand::Equilibrium) => (1.0, 0.0),
        _ => (weight, 1.0 - weight),
    };

    Ok(cloud_angle(external, cloud) * sun_weight + comfort_angle(external, actual) * temp_weight)
}

/// `BALANCED` slat angle: light and eco blended by the solar weight.
pub fn balanced_angle(solar_angle: f64, inputs: &EcoInputs) -> BlindsResult<f64> {
    let weight = solar_weight(check_solar_angle(solar_angle)?);
    let light = light_angle(solar_angle)?;
    let eco = eco_angle(inputs, weight)?;
    Ok(light * weight + eco * (1.0 - weight))
}

/// Slat angle in degrees to position percent, rounded and clamped.
pub fn angle_to_position(angle: f64) -> i32 {
    let position = (angle / ANGLE_SCALE).round();
    position.clamp(f64::from(MINIMUM_POSITION), f64::from(MAXIMUM_POSITION)) as i32
}

pub fn position_to_angle(position: i32) -> f64 {
    f64::from(position) * ANGLE_SCALE
}

/// Resolves a mode to a position using the sensor collaborators.
pub struct ModePolicy {
    solar: Box<dyn SolarAngleSource>,
    weather: Box<dyn WeatherSource>,
    temperature: Box<dyn TemperatureSensor>,
    desired_temp: f64,
}

impl ModePolicy {
    pub fn new(
        solar: Box<dyn SolarAngleSource>,
        weather: Box<dyn WeatherSource>,
        temperature: Box<dyn TemperatureSensor>,
        desired_temp: f64,
    ) -> Self {
        Self {
            solar,
            weather,
            temperature,
            desired_temp,
        }
    }

    fn eco_inputs(&mut self) -> Result<EcoInputs> {
        let weather = self
            .weather
            .conditions()
            .context("Weather source failed")?;
        let internal_temp = self
            .temperature
            .sample()
            .context("Temperature sensor failed")?;
        Ok(EcoInputs {
            cloud_cover: weather.cloud_cover,
            external_temp: weather.external_temp,
            internal_temp,
            desired_temp: self.desired_temp,
        })
    }

    /// Target position for `mode` at `at`.
    pub fn target_position(&mut self, mode: BlindMode, at: DateTime<Utc>) -> Result<i32> {
        let position = match mode {
            BlindMode::Manual(position) => position.value(),
            BlindMode::Dark => DARK_POSITION,
            BlindMode::Light => {
                let solar = self.solar.angle(at).context("Solar angle unavailable")?;
                angle_to_position(light_angle(solar)?)
            }
            BlindMode::Eco => {
                let solar = check_solar_angle(
                    self.solar.angle(at).context("Solar angle unavailable")?,
                )?;
                let inputs = self.eco_inputs()?;
                angle_to_position(eco_angle(&inputs, solar_weight(solar))?)
            }
            BlindMode::Balanced => {
                let solar = self.solar.angle(at).context("Solar angle unavailable")?;
                let inputs = self.eco_inputs()?;
                angle_to_position(balanced_angle(solar, &inputs)?)
            }
        };
        Ok(position)
    }
}
