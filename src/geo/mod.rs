//! Solar geometry for the configured location.

pub mod solar;

pub use solar::{DaylightWindow, SolarPosition, UnknownLocation, daylight_window, solar_elevation};
