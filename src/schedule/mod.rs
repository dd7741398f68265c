//! Blind behaviour model: modes, time blocks, the weekly schedule and manual commands.
//!
//! Everything here is pure data plus validation. Nothing touches the clock or
//! the filesystem; the resolution loop in [`crate::core`] feeds these types the
//! current instant and persists them through [`crate::state`].

pub mod block;
pub mod command;
pub mod week;

use std::fmt;

use crate::common::constants::{MAXIMUM_POSITION, MINIMUM_POSITION};
use crate::error::ModeError;

pub use block::{BlockPosition, TimeBlock, TimeBlockRecord, end_of_day, format_clock, parse_clock};
pub use command::{Command, CommandRecord};
pub use week::{Schedule, ScheduleRecord, WEEK, find_conflict, has_conflict, weekday_name};

/// A manual slat position in percent, `-100` (fully closed downward) to `100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(i32);

impl Position {
    pub fn new(value: i64) -> Result<Self, ModeError> {
        if (i64::from(MINIMUM_POSITION)..=i64::from(MAXIMUM_POSITION)).contains(&value) {
            Ok(Self(value as i32))
        } else {
            Err(ModeError::PositionOutOfRange(value))
        }
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the blind should behave while a block (or the default) is in effect.
///
/// Only `Manual` carries a payload; every other mode derives its target from
/// sensors at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlindMode {
    /// Track the sun so that direct light comes through.
    Light,
    /// Close fully.
    Dark,
    /// Angle the slats for heating or cooling efficiency.
    Eco,
    /// Blend of `Light` and `Eco` weighted by solar elevation.
    Balanced,
    /// Hold a fixed position.
    Manual(Position),
}

impl BlindMode {
    /// Build a mode from its wire name and optional position.
    ///
    /// Names are case-insensitive and `GREEN` is accepted for `ECO`. The
    /// position is required for `MANUAL` and ignored otherwise.
    pub fn from_parts(name: &str, position: Option<i64>) -> Result<Self, ModeError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LIGHT" => Ok(BlindMode::Light),
            "DARK" => Ok(BlindMode::Dark),
            "ECO" | "GREEN" => Ok(BlindMode::Eco),
            "BALANCED" => Ok(BlindMode::Balanced),
            "MANUAL" => {
                let value = position.ok_or(ModeError::MissingPosition)?;
                Ok(BlindMode::Manual(Position::new(value)?))
            }
            _ => Err(ModeError::UnknownMode(name.to_string())),
        }
    }

    pub fn manual(position: i64) -> Result<Self, ModeError> {
        Ok(BlindMode::Manual(Position::new(position)?))
    }

    /// Wire name of the mode.
    pub fn name(&self) -> &'static str {
        match self {
            BlindMode::Light => "LIGHT",
            BlindMode::Dark => "DARK",
            BlindMode::Eco => "ECO",
            BlindMode::Balanced => "BALANCED",
            BlindMode::Manual(_) => "MANUAL",
        }
    }

    pub fn position(&self) -> Option<i32> {
        match self {
            BlindMode::Manual(position) => Some(position.value()),
            _ => None,
        }
    }

    /// Whether the target depends on the solar-angle collaborator.
    pub fn needs_sun(&self) -> bool {
        matches!(self, BlindMode::Light | BlindMode::Eco | BlindMode::Balanced)
    }
}

impl fmt::Display for BlindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlindMode::Manual(position) => write!(f, "MANUAL {position}"),
            other => f.write_str(other.name()),
        }
    }
}
