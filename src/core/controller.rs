//! The single owner of schedule, override and motor state.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::control::policy::{ModePolicy, angle_to_position, position_to_angle};
use crate::control::{ActiveOverride, Resolution, Source, resolve};
use crate::motor::{AngleStepMapper, MicrostepResolution, StepPlan, StepperDriver};
use crate::schedule::{BlindMode, Schedule, format_clock};
use crate::state::{self, StatePaths};

use super::Intent;

/// Everything a [`Controller`] is built from.
pub struct ControllerParts {
    pub schedule: Schedule,
    pub active_override: Option<ActiveOverride>,
    pub policy: ModePolicy,
    pub mapper: AngleStepMapper,
    pub driver: Box<dyn StepperDriver>,
    pub resolution: MicrostepResolution,
    /// Where the active override is persisted. `None` keeps it in memory only.
    pub state: Option<StatePaths>,
}

/// What one resolution pass did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub resolution: Resolution,
    pub target: i32,
    /// `None` when the target already matched the current position.
    pub plan: Option<StepPlan>,
}

/// Snapshot for `status` output.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub source: Option<Source>,
    pub mode: Option<BlindMode>,
    pub current_position: Option<i32>,
    pub angle: Option<f64>,
    pub active_override: Option<ActiveOverride>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.source, self.mode) {
            (Some(source), Some(mode)) => write!(f, "{mode} from {source}")?,
            _ => f.write_str("not yet resolved")?,
        }
        if let Some(position) = self.current_position {
            write!(f, ", position {position}%")?;
        }
        if let Some(angle) = self.angle {
            write!(f, ", angle {angle:.1}°")?;
        }
        Ok(())
    }
}

pub struct Controller {
    schedule: Schedule,
    active_override: Option<ActiveOverride>,
    policy: ModePolicy,
    mapper: AngleStepMapper,
    driver: Box<dyn StepperDriver>,
    resolution: MicrostepResolution,
    state: Option<StatePaths>,
    current_position: Option<i32>,
    last_resolution: Option<Resolution>,
}

impl Controller {
    /// Select the microstep resolution and seed the cached position from the persisted angle.
    ///
    /// An unreadable angle leaves the cache empty; ticks keep failing until a
    /// calibration resets it.
    pub fn new(parts: ControllerParts) -> Result<Self> {
        let ControllerParts {
            schedule,
            active_override,
            policy,
            mut mapper,
            mut driver,
            resolution,
            state,
        } = parts;

        driver
            .set_resolution(resolution)
            .context("Failed to select microstep resolution")?;

        let current_position = match mapper.last_known_angle() {
            Ok(angle) => Some(angle_to_position(angle)),
            Err(e) => {
                log_warning!("Persisted motor angle unavailable: {e:#}");
                log_indented!("Run 'tiltr calibrate' once the slats are level");
                None
            }
        };

        Ok(Self {
            schedule,
            active_override,
            policy,
            mapper,
            driver,
            resolution,
            state,
            current_position,
            last_resolution: None,
        })
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn active_override(&self) -> Option<&ActiveOverride> {
        self.active_override.as_ref()
    }

    pub fn current_position(&self) -> Option<i32> {
        self.current_position
    }

    /// One resolution pass at the global clock's current instant.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.tick_at(crate::time::source::now())
    }

    /// One resolution pass at `now`.
    ///
    /// On error the persisted angle and cached position keep their previous
    /// values, so the next pass plans the same motion again.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let (date, weekday, time) = self.schedule.localize(now);
        let resolution = resolve(
            &self.schedule,
            self.active_override.as_ref(),
            date,
            weekday,
            time,
        );

        if resolution.clear_override {
            if let Some(expired) = self.active_override.take() {
                log_decorated!("Override {} expired", expired.block);
            }
            self.persist_override()?;
        }

        if self.last_resolution.map(|r| (r.source, r.mode))
            != Some((resolution.source, resolution.mode))
        {
            log_block_start!(
                "{} at {}: {}",
                capitalize(&resolution.source.to_string()),
                format_clock(time),
                resolution.mode
            );
        }
        self.last_resolution = Some(resolution);

        let target = self
            .policy
            .target_position(resolution.mode, now)
            .with_context(|| format!("Cannot compute {} target", resolution.mode))?;

        if self.current_position == Some(target) {
            return Ok(TickOutcome {
                resolution,
                target,
                plan: None,
            });
        }

        let plan = self
            .mapper
            .map_angle_to_step(position_to_angle(target), self.resolution)?;
        if plan.steps > 0
            && let Err(e) = self.driver.step(plan.steps, plan.direction)
        {
            if let Err(restore) = self.mapper.restore(&plan) {
                log_warning!("Failed to restore persisted angle: {restore:#}");
                self.current_position = None;
            }
            return Err(e.context("Stepper driver failed"));
        }
        log_indented!(
            "Position {}% ({:.1}° → {:.1}°, {} steps {})",
            target,
            plan.from_angle,
            plan.to_angle,
            plan.steps,
            plan.direction
        );
        self.current_position = Some(target);

        Ok(TickOutcome {
            resolution,
            target,
            plan: Some(plan),
        })
    }

    /// Apply an intent using the global clock. Returns whether to tick immediately.
    pub fn apply(&mut self, intent: Intent) -> Result<bool> {
        self.apply_at(intent, crate::time::source::now())
    }

    pub fn apply_at(&mut self, intent: Intent, now: DateTime<Utc>) -> Result<bool> {
        let force = intent.force_update();
        match intent {
            Intent::ReplaceSchedule { schedule, .. } => {
                self.schedule = schedule;
                log_block_start!("Installed new schedule");
            }
            Intent::ClearSchedule { .. } => {
                self.schedule.clear_all();
                log_block_start!(
                    "Cleared schedule, default {} applies",
                    self.schedule.default_mode()
                );
            }
            Intent::SetOverride { command, .. } => {
                let (date, _, time) = self.schedule.localize(now);
                match command.to_time_block(|| time) {
                    Some(block) => {
                        log_block_start!("Override set: {block}");
                        self.active_override = Some(ActiveOverride::new(block, date));
                        self.persist_override()?;
                    }
                    None => {
                        log_block_start!("Override starting at {} is empty", format_clock(time));
                        log_indented!("Nothing left of today to override");
                        return Ok(false);
                    }
                }
            }
            Intent::ClearOverride { .. } => {
                if self.active_override.take().is_some() {
                    log_block_start!("Override cleared");
                }
                self.persist_override()?;
            }
            Intent::Calibrate => {
                self.mapper.calibrate()?;
                self.current_position = Some(0);
                log_block_start!("Calibrated: current slat position is now 0°");
            }
        }
        Ok(force)
    }

    pub fn status(&mut self) -> Status {
        Status {
            source: self.last_resolution.map(|r| r.source),
            mode: self.last_resolution.map(|r| r.mode),
            current_position: self.current_position,
            angle: self.mapper.last_known_angle().ok(),
            active_override: self.active_override.clone(),
        }
    }

    fn persist_override(&self) -> Result<()> {
        let Some(paths) = &self.state else {
            return Ok(());
        };
        match &self.active_override {
            Some(active) => state::save_override(paths, active),
            None => state::clear_override(paths),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::{MockStepperDriver, StepDirection};
    use crate::schedule::{Command, TimeBlock};
    use crate::sensors::{FixedTemperature, FixedWeather, SolarAngleSource, Weather};
    use crate::state::angle::MemoryAngleStore;
    use chrono::{NaiveTime, Weekday};
    use mockall::predicate::eq;
    use std::collections::HashMap;

    struct FixedSun(f64);

    impl SolarAngleSource for FixedSun {
        fn angle(&self, _at: DateTime<Utc>) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn policy(sun: f64) -> ModePolicy {
        ModePolicy::new(
            Box::new(FixedSun(sun)),
            Box::new(FixedWeather::new(Weather {
                cloud_cover: 10.0,
                external_temp: 22.0,
            })),
            Box::new(FixedTemperature::new(22.0)),
            22.0,
        )
    }

    /// Monday 16:00-19:00 LIGHT, default ECO, read in UTC.
    fn schedule() -> Schedule {
        let mut days: HashMap<Weekday, Vec<TimeBlock>> =
            crate::schedule::WEEK.into_iter().map(|d| (d, Vec::new())).collect();
        days.insert(
            Weekday::Mon,
            vec![TimeBlock::new(t(16, 0), t(19, 0), BlindMode::Light).unwrap()],
        );
        Schedule::new(BlindMode::Eco, Some(days))
            .unwrap()
            .with_timezone(Some(chrono_tz::UTC))
    }

    fn controller(driver: MockStepperDriver, store: MemoryAngleStore) -> Controller {
        Controller::new(ControllerParts {
            schedule: schedule(),
            active_override: None,
            policy: policy(30.0),
            mapper: AngleStepMapper::new(Box::new(store), 1.0),
            driver: Box::new(driver),
            resolution: MicrostepResolution::Full,
            state: None,
        })
        .unwrap()
    }

    fn driver_expecting_resolution() -> MockStepperDriver {
        let mut driver = MockStepperDriver::new();
        driver
            .expect_set_resolution()
            .with(eq(MicrostepResolution::Full))
            .times(1)
            .returning(|_| Ok(()));
        driver
    }

    #[test]
    fn test_override_within_wins_over_block_and_default() {
        let mut driver = driver_expecting_resolution();
        // 70% → 63° from 0° at 1.8°/step.
        driver
            .expect_step()
            .with(eq(35), eq(StepDirection::Forward))
            .times(1)
            .returning(|_, _| Ok(()));
        let store = MemoryAngleStore::default();
        let mut controller = controller(driver, store.clone());

        let command = Command::from_parts("MANUAL", 120, Some(70)).unwrap();
        let force = controller
            .apply_at(
                Intent::SetOverride {
                    command,
                    force_update: true,
                },
                utc("2024-06-03T16:31:00Z"),
            )
            .unwrap();
        assert!(force);

        let outcome = controller.tick_at(utc("2024-06-03T17:00:00Z")).unwrap();
        assert_eq!(outcome.resolution.source, Source::Override);
        assert_eq!(outcome.target, 70);
        assert!((store.angle() - 63.0).abs() < 1e-9);
    }

    #[test]
    fn test_unchanged_target_issues_no_motion() {
        let mut driver = driver_expecting_resolution();
        driver.expect_step().times(1).returning(|_, _| Ok(()));
        let mut controller = controller(driver, MemoryAngleStore::default());

        // LIGHT with the sun at 30° → -30° → -33%.
        let first = controller.tick_at(utc("2024-06-03T17:00:00Z")).unwrap();
        assert_eq!(first.resolution.source, Source::Scheduled);
        assert_eq!(first.target, -33);
        assert!(first.plan.is_some());

        let second = controller.tick_at(utc("2024-06-03T17:01:00Z")).unwrap();
        assert_eq!(second.plan, None);
        assert_eq!(controller.current_position(), Some(-33));
    }

    #[test]
    fn test_expired_override_is_cleared_on_tick() {
        let mut driver = driver_expecting_resolution();
        driver.expect_step().returning(|_, _| Ok(()));
        let mut controller = controller(driver, MemoryAngleStore::default());

        controller
            .apply_at(
                Intent::SetOverride {
                    command: Command::from_parts("DARK", 10, None).unwrap(),
                    force_update: false,
                },
                utc("2024-06-03T20:00:00Z"),
            )
            .unwrap();
        assert!(controller.active_override().is_some());

        let outcome = controller.tick_at(utc("2024-06-03T20:10:00Z")).unwrap();
        assert_eq!(outcome.resolution.source, Source::Default);
        assert!(controller.active_override().is_none());
    }

    #[test]
    fn test_empty_projection_keeps_existing_override() {
        let driver = driver_expecting_resolution();
        let mut controller = controller(driver, MemoryAngleStore::default());

        controller
            .apply_at(
                Intent::SetOverride {
                    command: Command::from_parts("DARK", 0, None).unwrap(),
                    force_update: false,
                },
                utc("2024-06-03T20:00:00Z"),
            )
            .unwrap();
        let before = controller.active_override().cloned();

        let force = controller
            .apply_at(
                Intent::SetOverride {
                    command: Command::from_parts("LIGHT", 30, None).unwrap(),
                    force_update: true,
                },
                utc("2024-06-03T23:59:30Z"),
            )
            .unwrap();
        assert!(!force);
        assert_eq!(controller.active_override().cloned(), before);
    }

    #[test]
    fn test_failed_policy_keeps_position() {
        let mut driver = driver_expecting_resolution();
        driver.expect_step().never();
        let store = MemoryAngleStore::new(18.0);
        let mut controller = Controller::new(ControllerParts {
            schedule: schedule(),
            active_override: None,
            policy: policy(120.0),
            mapper: AngleStepMapper::new(Box::new(store.clone()), 1.0),
            driver: Box::new(driver),
            resolution: MicrostepResolution::Full,
            state: None,
        })
        .unwrap();
        assert_eq!(controller.current_position(), Some(20));

        // ECO default rejects a solar angle outside [-90, 90].
        assert!(controller.tick_at(utc("2024-06-03T10:00:00Z")).is_err());
        assert_eq!(controller.current_position(), Some(20));
        assert_eq!(store.angle(), 18.0);
    }

    #[test]
    fn test_failed_step_is_retried_next_pass() {
        let mut driver = driver_expecting_resolution();
        let mut seq = mockall::Sequence::new();
        driver
            .expect_step()
            .withf(|count, direction| *count > 0 && *direction == StepDirection::Reverse)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("pulse train interrupted")));
        driver
            .expect_step()
            .withf(|count, direction| *count > 0 && *direction == StepDirection::Reverse)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        let store = MemoryAngleStore::default();
        let mut controller = controller(driver, store.clone());

        // LIGHT block with the sun at 30° wants -33%.
        let err = controller
            .tick_at(utc("2024-06-03T17:00:00Z"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("pulse train interrupted"));
        assert_eq!(store.angle(), 0.0);
        assert_eq!(controller.current_position(), Some(0));

        let retry = controller.tick_at(utc("2024-06-03T17:01:00Z")).unwrap();
        let plan = retry.plan.unwrap();
        assert_eq!(plan.from_angle, 0.0);
        assert!(plan.steps > 0);
        assert_eq!(store.angle(), plan.to_angle);
        assert_eq!(controller.current_position(), Some(-33));
    }

    #[test]
    fn test_calibrate_resets_without_moving() {
        let mut driver = driver_expecting_resolution();
        driver.expect_step().never();
        let store = MemoryAngleStore::new(45.0);
        let mut controller = controller(driver, store.clone());

        let force = controller.apply_at(Intent::Calibrate, utc("2024-06-03T10:00:00Z"));
        assert!(!force.unwrap());
        assert_eq!(store.angle(), 0.0);
        assert_eq!(controller.current_position(), Some(0));

        let status = controller.status();
        assert_eq!(status.angle, Some(0.0));
        assert_eq!(status.source, None);
    }

    #[test]
    fn test_clear_schedule_falls_back_to_default() {
        let mut driver = driver_expecting_resolution();
        driver.expect_step().returning(|_, _| Ok(()));
        let mut controller = controller(driver, MemoryAngleStore::default());

        controller
            .apply_at(
                Intent::ClearSchedule {
                    force_update: true,
                },
                utc("2024-06-03T17:00:00Z"),
            )
            .unwrap();
        let outcome = controller.tick_at(utc("2024-06-03T17:00:00Z")).unwrap();
        assert_eq!(outcome.resolution.source, Source::Default);
        assert_eq!(outcome.resolution.mode, BlindMode::Eco);
    }

    #[test]
    fn test_override_is_persisted_and_cleared() {
        let temp = tempfile::tempdir().unwrap();
        let paths = StatePaths::new(temp.path());
        let mut driver = driver_expecting_resolution();
        driver.expect_step().returning(|_, _| Ok(()));
        let mut controller = Controller::new(ControllerParts {
            schedule: schedule(),
            active_override: None,
            policy: policy(30.0),
            mapper: AngleStepMapper::new(Box::new(MemoryAngleStore::default()), 1.0),
            driver: Box::new(driver),
            resolution: MicrostepResolution::Full,
            state: Some(paths.clone()),
        })
        .unwrap();

        controller
            .apply_at(
                Intent::SetOverride {
                    command: Command::from_parts("MANUAL", 60, Some(10)).unwrap(),
                    force_update: false,
                },
                utc("2024-06-03T08:00:00Z"),
            )
            .unwrap();
        let saved = state::load_override(&paths).unwrap().unwrap();
        assert_eq!(saved.block.start(), t(8, 0));
        assert_eq!(saved.block.end(), t(9, 0));

        controller
            .apply_at(
                Intent::ClearOverride {
                    force_update: false,
                },
                utc("2024-06-03T08:05:00Z"),
            )
            .unwrap();
        assert_eq!(state::load_override(&paths).unwrap(), None);
    }
}
