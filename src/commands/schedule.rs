//! `tiltr schedule`: check, install, clear and show the weekly schedule file.

use std::path::Path;

use anyhow::{Context, Result};
use nix::sys::signal::Signal;

use crate::common::utils::private_path;
use crate::config;
use crate::schedule::Schedule;
use crate::state;

use super::{daemon_pid, load_configured_schedule, log_schedule, signal_daemon};

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleAction {
    /// Parse and validate a file without installing it.
    Check(String),
    /// Validate a file and make it the configured schedule.
    Install(String),
    /// Empty every day, keeping the default mode.
    Clear,
    Show,
}

pub fn handle_schedule_command(action: ScheduleAction, debug_enabled: bool) -> Result<()> {
    log_version!();
    match action {
        ScheduleAction::Check(file) => {
            let schedule = read_schedule_file(Path::new(&file))?;
            log_block_start!("{} is a valid schedule", private_path(Path::new(&file)));
            log_schedule(&schedule);
        }
        ScheduleAction::Install(file) => {
            let schedule = read_schedule_file(Path::new(&file))?;
            let config = config::load()?;
            let target = config.schedule_path(&config::get_config_base_dir()?);
            state::save_schedule(&target, &schedule)?;
            log_block_start!("Installed schedule to {}", private_path(&target));
            log_schedule(&schedule);
            notify_daemon(debug_enabled)?;
        }
        ScheduleAction::Clear => {
            let config = config::load()?;
            let (path, mut schedule) = load_configured_schedule(&config)?;
            schedule.clear_all();
            state::save_schedule(&path, &schedule)?;
            log_block_start!(
                "Cleared {}, default {} applies",
                private_path(&path),
                schedule.default_mode()
            );
            notify_daemon(debug_enabled)?;
        }
        ScheduleAction::Show => {
            let config = config::load()?;
            let (path, schedule) = load_configured_schedule(&config)?;
            log_block_start!("Schedule: {}", private_path(&path));
            if !path.exists() {
                log_indented!("File not found, showing the configured default");
            }
            log_schedule(&schedule);
        }
    }
    log_end!();
    Ok(())
}

fn read_schedule_file(path: &Path) -> Result<Schedule> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", private_path(path)))?;
    Schedule::from_json_str(&text)
        .with_context(|| format!("Invalid schedule in {}", private_path(path)))
}

/// Ask a running daemon to re-read the schedule file.
fn notify_daemon(debug_enabled: bool) -> Result<()> {
    match daemon_pid() {
        Some(pid) => {
            signal_daemon(pid, Signal::SIGUSR2)?;
            log_decorated!("Signaled tiltr (PID: {pid}) to reload");
            if debug_enabled {
                log_debug!("SIGUSR2 sent to process {pid}");
            }
        }
        None => log_indented!("tiltr isn't running; the schedule applies on next start"),
    }
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("schedule - Manage the weekly schedule");
    log_block_start!("Usage: tiltr schedule <check FILE | install FILE | clear | show>");
    log_block_start!("Actions:");
    log_indented!("check FILE    Validate a schedule file without installing it");
    log_indented!("install FILE  Validate FILE and install it as the active schedule");
    log_indented!("clear         Remove every time block; the default mode applies");
    log_indented!("show          Print the installed schedule");
    log_block_start!("Notes:");
    log_indented!("A running daemon is told to reload (SIGUSR2) after install and clear");
    log_end!();
}
