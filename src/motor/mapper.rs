//! Converts a desired slat angle into a direction and step count.

use anyhow::Result;

use super::{MicrostepResolution, StepDirection};
use crate::state::angle::AngleStore;

/// Motion needed to go from the believed angle to the desired one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPlan {
    pub from_angle: f64,
    pub to_angle: f64,
    pub steps: u32,
    pub direction: StepDirection,
}

/// Open-loop mapper backed by the persisted angle.
pub struct AngleStepMapper {
    store: Box<dyn AngleStore>,
    correction: f64,
}

impl AngleStepMapper {
    /// `correction` scales step counts to compensate for gear backlash (1.0 = none).
    pub fn new(store: Box<dyn AngleStore>, correction: f64) -> Self {
        Self { store, correction }
    }

    /// Plan a move to `desired` degrees and record `desired` as the new belief.
    ///
    /// The persisted angle reflects the command, not verified motion.
    pub fn map_angle_to_step(
        &mut self,
        desired: f64,
        resolution: MicrostepResolution,
    ) -> Result<StepPlan> {
        let last_known = self.store.replace(desired)?;
        let delta = desired - last_known;
        let direction = if delta >= 0.0 {
            StepDirection::Forward
        } else {
            StepDirection::Reverse
        };
        let raw_steps = (delta.abs() / resolution.step_degrees()).round();
        let steps = (raw_steps * self.correction).round() as u32;

        Ok(StepPlan {
            from_angle: last_known,
            to_angle: desired,
            steps,
            direction,
        })
    }

    /// Angle covered by `steps` in `direction`; negative when reversing.
    pub fn map_step_to_angle(
        steps: u32,
        direction: StepDirection,
        resolution: MicrostepResolution,
    ) -> f64 {
        let angle = f64::from(steps) * resolution.step_degrees();
        match direction {
            StepDirection::Forward => angle,
            StepDirection::Reverse => -angle,
        }
    }

    pub fn last_known_angle(&mut self) -> Result<f64> {
        self.store.get()
    }

    /// Put back the belief a plan replaced when its motion never happened.
    pub fn restore(&mut self, plan: &StepPlan) -> Result<()> {
        self.store.set(plan.from_angle)
    }

    /// Declare the current physical position to be 0° without moving.
    pub fn calibrate(&mut self) -> Result<()> {
        self.store.set(0.0)
    }
}
