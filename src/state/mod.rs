//! Persistent runtime state under `XDG_STATE_HOME`.
//!
//! ```text
//! $XDG_STATE_HOME/tiltr/<namespace>/
//!     angle           believed slat angle in degrees (flock-protected)
//!     override.json   the active manual override, if any
//!     request.json    a pending request left by the CLI for the daemon
//! ```
//!
//! The namespace is `default` for the default config directory and
//! `custom_<hash>` for a `--config` directory, so two daemons driving two blinds
//! from two config directories never share state.

pub mod angle;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::common::constants::{ANGLE_FILE_NAME, OVERRIDE_FILE_NAME, REQUEST_FILE_NAME};
use crate::common::utils::{private_path, write_atomically};
use crate::control::ActiveOverride;
use crate::schedule::{BlindMode, CommandRecord, Schedule, TimeBlock, TimeBlockRecord};

/// Per-config-directory namespace shared by the state directory and the lock file.
pub fn namespace(config_dir: Option<&Path>) -> String {
    match config_dir {
        None => "default".to_string(),
        Some(path) => {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            let hash = sha256::digest(canonical.to_string_lossy().as_bytes());
            format!("custom_{}", &hash[..16])
        }
    }
}

/// State directory for a config directory (`None` = the default one).
pub fn get_state_dir(config_dir: Option<&Path>) -> Result<PathBuf> {
    let state_home = std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            dirs::home_dir()
                .map(|home| home.join(".local/state"))
                .context("Could not determine home directory")
        })?;

    Ok(state_home.join("tiltr").join(namespace(config_dir)))
}

/// Paths of the individual state files.
#[derive(Debug, Clone, PartialEq)]
pub struct StatePaths {
    pub dir: PathBuf,
}

impl StatePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// State for the active config directory.
    pub fn current() -> Result<Self> {
        let config_dir = crate::config::get_custom_config_dir();
        Ok(Self::new(get_state_dir(config_dir.as_deref())?))
    }

    pub fn angle(&self) -> PathBuf {
        self.dir.join(ANGLE_FILE_NAME)
    }

    pub fn override_file(&self) -> PathBuf {
        self.dir.join(OVERRIDE_FILE_NAME)
    }

    pub fn request_file(&self) -> PathBuf {
        self.dir.join(REQUEST_FILE_NAME)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OverrideRecord {
    date: NaiveDate,
    block: TimeBlockRecord,
}

pub fn save_override(paths: &StatePaths, active: &ActiveOverride) -> Result<()> {
    let record = OverrideRecord {
        date: active.date,
        block: active.block.to_record(),
    };
    let json = serde_json::to_vec_pretty(&record)?;
    write_atomically(&paths.override_file(), &json)
}

/// Load the saved override. A missing file is `None`.
pub fn load_override(paths: &StatePaths) -> Result<Option<ActiveOverride>> {
    let path = paths.override_file();
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", private_path(&path)))?;
    let record: OverrideRecord = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", private_path(&path)))?;
    let block = TimeBlock::from_record(&record.block)?;
    Ok(Some(ActiveOverride {
        block,
        date: record.date,
    }))
}

pub fn clear_override(paths: &StatePaths) -> Result<()> {
    let path = paths.override_file();
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", private_path(&path))),
    }
}

/// Read the weekly schedule file.
///
/// A missing file yields an empty schedule with `fallback` as its default. A
/// `timezone` in the file wins over `timezone` from the configuration.
pub fn load_schedule(path: &Path, fallback: BlindMode, timezone: Option<Tz>) -> Result<Schedule> {
    if !path.exists() {
        return Ok(Schedule::new(fallback, None)?.with_timezone(timezone));
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", private_path(path)))?;
    let schedule = Schedule::from_json_str(&raw)
        .with_context(|| format!("Invalid schedule in {}", private_path(path)))?;
    let zone = schedule.timezone().or(timezone);
    Ok(schedule.with_timezone(zone))
}

pub fn save_schedule(path: &Path, schedule: &Schedule) -> Result<()> {
    let json = serde_json::to_vec_pretty(&schedule.to_record())?;
    write_atomically(path, &json)
}

/// A change requested from outside the daemon, delivered as `request.json` + SIGUSR1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    SetOverride {
        command: CommandRecord,
        #[serde(default = "default_force")]
        force_update: bool,
    },
    ClearOverride {
        #[serde(default = "default_force")]
        force_update: bool,
    },
    Calibrate,
}

fn default_force() -> bool {
    true
}

pub fn write_request(paths: &StatePaths, request: &Request) -> Result<()> {
    let json = serde_json::to_vec_pretty(request)?;
    write_atomically(&paths.request_file(), &json)
}

/// Read and delete the pending request, if any.
pub fn take_request(paths: &StatePaths) -> Result<Option<Request>> {
    let path = paths.request_file();
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", private_path(&path)));
        }
    };
    let _ = std::fs::remove_file(&path);
    let request = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse request in {}", private_path(&path)))?;
    Ok(Some(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlindsError;
    use chrono::{NaiveTime, Weekday};
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn test_state_dir_namespaces() {
        let temp = tempdir().unwrap();
        let original = std::env::var("XDG_STATE_HOME").ok();
        unsafe {
            std::env::set_var("XDG_STATE_HOME", temp.path());
        }

        let default_dir = get_state_dir(None).unwrap();
        let custom_dir = get_state_dir(Some(Path::new("/etc/tiltr-attic"))).unwrap();

        unsafe {
            match original {
                Some(value) => std::env::set_var("XDG_STATE_HOME", value),
                None => std::env::remove_var("XDG_STATE_HOME"),
            }
        }

        assert_eq!(default_dir, temp.path().join("tiltr").join("default"));
        let name = custom_dir.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("custom_"));
        assert_eq!(name.len(), "custom_".len() + 16);
    }

    #[test]
    fn test_override_persistence() {
        let temp = tempdir().unwrap();
        let paths = StatePaths::new(temp.path());
        assert_eq!(load_override(&paths).unwrap(), None);

        let active = ActiveOverride {
            block: TimeBlock::new(
                NaiveTime::from_hms_opt(16, 31, 0).unwrap(),
                NaiveTime::from_hms_opt(18, 31, 0).unwrap(),
                BlindMode::manual(70).unwrap(),
            )
            .unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        };
        save_override(&paths, &active).unwrap();
        assert_eq!(load_override(&paths).unwrap(), Some(active));

        clear_override(&paths).unwrap();
        assert_eq!(load_override(&paths).unwrap(), None);
        clear_override(&paths).unwrap();
    }

    #[test]
    fn test_missing_schedule_file_uses_fallback() {
        let temp = tempdir().unwrap();
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let schedule = load_schedule(
            &temp.path().join("schedule.json"),
            BlindMode::Eco,
            Some(tz),
        )
        .unwrap();
        assert!(schedule.is_empty());
        assert_eq!(schedule.default_mode(), BlindMode::Eco);
        assert_eq!(schedule.timezone(), Some(tz));
    }

    #[test]
    fn test_schedule_file_round_trip_and_timezone_precedence() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("schedule.json");
        let mut schedule = Schedule::default()
            .with_timezone(Some("America/Edmonton".parse().unwrap()));
        schedule
            .replace_day(
                Weekday::Wed,
                vec![TimeBlock::new(
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                    BlindMode::Balanced,
                )
                .unwrap()],
            )
            .unwrap();
        save_schedule(&path, &schedule).unwrap();

        let loaded =
            load_schedule(&path, BlindMode::Light, Some("Europe/Berlin".parse().unwrap()))
                .unwrap();
        assert_eq!(loaded, schedule);
    }

    #[test]
    fn test_conflicting_schedule_file_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("schedule.json");
        let day = r#"[{"start": "12:00", "end": "15:00", "mode": "LIGHT"},
                      {"start": "14:00", "end": "16:00", "mode": "DARK"}]"#;
        std::fs::write(
            &path,
            format!(
                r#"{{"default_mode": "DARK", "default_pos": null, "schedule": {{
                    "sunday": {day}, "monday": [], "tuesday": [], "wednesday": [],
                    "thursday": [], "friday": [], "saturday": []}}}}"#
            ),
        )
        .unwrap();

        let err = load_schedule(&path, BlindMode::Dark, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BlindsError>(),
            Some(BlindsError::SchedulingConflict { .. })
        ));
    }

    #[test]
    fn test_request_round_trip_and_consumption() {
        let temp = tempdir().unwrap();
        let paths = StatePaths::new(temp.path());
        let request = Request::SetOverride {
            command: CommandRecord {
                mode: "MANUAL".to_string(),
                duration: 120,
                position: Some(70),
            },
            force_update: true,
        };
        write_request(&paths, &request).unwrap();

        let raw = std::fs::read_to_string(paths.request_file()).unwrap();
        assert!(raw.contains("\"request\": \"set_override\""));

        assert_eq!(take_request(&paths).unwrap(), Some(request));
        assert_eq!(take_request(&paths).unwrap(), None);
    }

    #[test]
    fn test_request_force_defaults_to_true() {
        let request: Request = serde_json::from_str(r#"{"request": "clear_override"}"#).unwrap();
        assert_eq!(request, Request::ClearOverride { force_update: true });
        let request: Request = serde_json::from_str(r#"{"request": "calibrate"}"#).unwrap();
        assert_eq!(request, Request::Calibrate);
    }
}
