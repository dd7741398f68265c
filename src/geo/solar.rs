//! Solar elevation from latitude, longitude and time.
//!
//! Elevation uses the low-precision almanac formulas (good to about 0.01°
//! between 1950 and 2050), which is far finer than a slat can be positioned.
//! Sunrise and sunset come from the `sunrise` crate and are only used for
//! diagnostics.

use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::sensors::SolarAngleSource;

const J2000: f64 = 2_451_545.0;
const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;

/// Elevation of the sun above the horizon in degrees, `[-90, 90]`.
pub fn solar_elevation(latitude: f64, longitude: f64, at: DateTime<Utc>) -> f64 {
    let julian_day = at.timestamp() as f64 / 86_400.0 + UNIX_EPOCH_JULIAN_DAY;
    let n = julian_day - J2000;

    let mean_longitude = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    let right_ascension = (obliquity.cos() * ecliptic_longitude.sin())
        .atan2(ecliptic_longitude.cos())
        .to_degrees();
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();

    let sidereal_hours = (18.697_374_558 + 24.065_709_824_419_08 * n).rem_euclid(24.0);
    let hour_angle = (sidereal_hours * 15.0 + longitude - right_ascension).to_radians();

    let latitude = latitude.to_radians();
    let sin_elevation =
        latitude.sin() * declination.sin() + latitude.cos() * declination.cos() * hour_angle.cos();
    sin_elevation.clamp(-1.0, 1.0).asin().to_degrees()
}

/// The sun as seen from a fixed location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    latitude: f64,
    longitude: f64,
}

impl SolarPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl SolarAngleSource for SolarPosition {
    fn angle(&self, at: DateTime<Utc>) -> Result<f64> {
        Ok(solar_elevation(self.latitude, self.longitude, at))
    }
}

/// Stand-in used when no coordinates are configured. Sun-driven modes fail.
pub struct UnknownLocation;

impl SolarAngleSource for UnknownLocation {
    fn angle(&self, _at: DateTime<Utc>) -> Result<f64> {
        bail!("latitude and longitude are not configured")
    }
}

/// Sunrise and sunset for one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaylightWindow {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

pub fn daylight_window(latitude: f64, longitude: f64, date: NaiveDate) -> Option<DaylightWindow> {
    let coordinates = Coordinates::new(latitude, longitude)?;
    let day = SolarDay::new(coordinates, date);
    Some(DaylightWindow {
        sunrise: day.event_time(SolarEvent::Sunrise),
        sunset: day.event_time(SolarEvent::Sunset),
    })
}
