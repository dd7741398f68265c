//! Typed failures raised by the schedule model and the mode policy.
//!
//! Application plumbing (config, files, signals) uses `anyhow`; these variants
//! exist so callers can tell a bad time block from a bad schedule or a sensor
//! reading out of range without string matching.

use thiserror::Error;

/// Errors from constructing or validating blind behaviour.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlindsError {
    #[error("Invalid time block: {0}")]
    InvalidTimeBlock(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Scheduling conflict on {day}: {earlier} overlaps {later}")]
    SchedulingConflict {
        day: String,
        earlier: String,
        later: String,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Solar angle {0} is outside [-90, 90]")]
    InvalidSolarAngle(f64),

    #[error("Cloud coverage {0}% is outside [0, 100]")]
    InvalidCoverage(f64),
}

/// Problems with a mode name or its position payload.
///
/// Wrapped into the [`BlindsError`] variant of whatever was being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("unrecognized mode '{0}'")]
    UnknownMode(String),

    #[error("MANUAL mode requires a position")]
    MissingPosition,

    #[error("position {0} is outside [-100, 100]")]
    PositionOutOfRange(i64),
}

pub type BlindsResult<T> = std::result::Result<T, BlindsError>;
