//! Stepper motor abstraction and the open-loop angle/step mapping.
//!
//! The controller never learns where the slats physically are. It tracks a
//! believed angle (see [`crate::state::angle`]) and converts differences in that
//! belief into microsteps for a driver such as an EasyDriver/A3967 board.

pub mod mapper;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::common::constants::FULL_STEP_DEGREES;

pub use mapper::{AngleStepMapper, StepPlan};

/// Microstep setting of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MicrostepResolution {
    Full,
    Half,
    Quarter,
    Eighth,
}

impl MicrostepResolution {
    /// Degrees of shaft rotation per step pulse.
    pub fn step_degrees(self) -> f64 {
        match self {
            MicrostepResolution::Full => FULL_STEP_DEGREES,
            MicrostepResolution::Half => FULL_STEP_DEGREES / 2.0,
            MicrostepResolution::Quarter => FULL_STEP_DEGREES / 4.0,
            MicrostepResolution::Eighth => FULL_STEP_DEGREES / 8.0,
        }
    }

    /// Logic levels for the driver's (MS1, MS2) select pins.
    pub fn select_pins(self) -> (bool, bool) {
        match self {
            MicrostepResolution::Full => (false, false),
            MicrostepResolution::Half => (true, false),
            MicrostepResolution::Quarter => (false, true),
            MicrostepResolution::Eighth => (true, true),
        }
    }
}

impl fmt::Display for MicrostepResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MicrostepResolution::Full => "full",
            MicrostepResolution::Half => "half",
            MicrostepResolution::Quarter => "quarter",
            MicrostepResolution::Eighth => "eighth",
        })
    }
}

impl FromStr for MicrostepResolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(MicrostepResolution::Full),
            "half" => Ok(MicrostepResolution::Half),
            "quarter" => Ok(MicrostepResolution::Quarter),
            "eighth" => Ok(MicrostepResolution::Eighth),
            other => anyhow::bail!(
                "unknown microstep resolution '{other}' (expected full, half, quarter or eighth)"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Forward,
    Reverse,
}

impl fmt::Display for StepDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepDirection::Forward => "forward",
            StepDirection::Reverse => "reverse",
        })
    }
}

/// A stepper driver. `step` blocks until the pulses have been issued.
#[cfg_attr(test, mockall::automock)]
pub trait StepperDriver: Send {
    fn set_resolution(&mut self, resolution: MicrostepResolution) -> Result<()>;
    fn step(&mut self, count: u32, direction: StepDirection) -> Result<()>;
}

/// Driver that only logs what it would do. Used when no hardware is attached.
#[derive(Debug, Default)]
pub struct DryRunDriver {
    resolution: Option<MicrostepResolution>,
    net_steps: i64,
    debug_enabled: bool,
}

impl DryRunDriver {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            ..Self::default()
        }
    }

    /// Forward steps minus reverse steps issued so far.
    pub fn net_steps(&self) -> i64 {
        self.net_steps
    }
}

impl StepperDriver for DryRunDriver {
    fn set_resolution(&mut self, resolution: MicrostepResolution) -> Result<()> {
        if self.resolution != Some(resolution) && self.debug_enabled {
            let (ms1, ms2) = resolution.select_pins();
            log_debug!(
                "Microstep resolution {resolution} (MS1={}, MS2={})",
                u8::from(ms1),
                u8::from(ms2)
            );
        }
        self.resolution = Some(resolution);
        Ok(())
    }

    fn step(&mut self, count: u32, direction: StepDirection) -> Result<()> {
        match direction {
            StepDirection::Forward => self.net_steps += i64::from(count),
            StepDirection::Reverse => self.net_steps -= i64::from(count),
        }
        if self.debug_enabled {
            log_debug!("Dry run: {count} steps {direction} (net {})", self.net_steps);
        }
        Ok(())
    }
}
