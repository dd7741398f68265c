//! One-shot CLI commands.
//!
//! Commands never touch the daemon's in-memory state directly. They write a
//! file (the schedule, or `request.json`) and then signal the running daemon,
//! or, when no daemon is running, update the persisted state it reads on start.

pub mod calibrate;
pub mod help;
pub mod overrides;
pub mod reload;
pub mod schedule;
pub mod simulate;
pub mod status;
pub mod stop;

use std::path::PathBuf;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::config::{self, Config};
use crate::io::lock::{lock_path, read_running_pid};
use crate::schedule::{BlindMode, Schedule, WEEK, weekday_name};
use crate::state;

/// PID of the daemon serving the active config directory.
pub fn daemon_pid() -> Option<u32> {
    read_running_pid(&lock_path(config::get_custom_config_dir().as_deref()))
}

pub fn signal_daemon(pid: u32, signal: Signal) -> Result<()> {
    kill(Pid::from_raw(pid as i32), signal)
        .with_context(|| format!("Failed to send {signal} to tiltr (PID: {pid})"))
}

/// The configured schedule file and its parsed contents.
pub(crate) fn load_configured_schedule(config: &Config) -> Result<(PathBuf, Schedule)> {
    let path = config.schedule_path(&config::get_config_base_dir()?);
    let fallback = BlindMode::from_parts(config.default_mode(), config.default_position)
        .context("Invalid default_mode in configuration")?;
    let schedule = state::load_schedule(&path, fallback, config.timezone())?;
    Ok((path, schedule))
}

/// Print a schedule one weekday per line group.
pub(crate) fn log_schedule(schedule: &Schedule) {
    log_decorated!("Default: {}", schedule.default_mode());
    if let Some(tz) = schedule.timezone() {
        log_indented!("Timezone: {tz}");
    }
    if schedule.is_empty() {
        log_indented!("No time blocks");
        return;
    }
    for day in WEEK {
        let blocks = schedule.blocks(day);
        if blocks.is_empty() {
            continue;
        }
        log_decorated!("{}", weekday_name(day));
        for block in blocks {
            log_indented!("{block}");
        }
    }
}
