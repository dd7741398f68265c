//! `tiltr status`: print the persisted state and what governs the blind now.

use anyhow::Result;

use crate::config;
use crate::control::policy::angle_to_position;
use crate::control::resolve;
use crate::schedule::weekday_name;
use crate::state::angle::{AngleStore, FileAngleStore};
use crate::state::{self, StatePaths};

use super::{daemon_pid, load_configured_schedule};

pub fn handle_status_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    match daemon_pid() {
        Some(pid) => log_block_start!("tiltr is running (PID: {pid})"),
        None => log_block_start!("tiltr isn't running"),
    }

    let paths = StatePaths::current()?;
    if debug_enabled {
        log_debug!("State directory: {}", paths.dir.display());
    }

    let angle_path = paths.angle();
    if angle_path.exists() {
        match FileAngleStore::new(angle_path).get() {
            Ok(angle) => log_decorated!(
                "Slat angle: {angle:.1}° (position {}%)",
                angle_to_position(angle)
            ),
            Err(e) => {
                log_warning!("Persisted angle is unreadable: {e:#}");
                log_indented!("Run `tiltr calibrate` after levelling the slats");
            }
        }
    } else {
        log_decorated!("Slat angle: 0.0° (never moved)");
    }

    let active = match state::load_override(&paths) {
        Ok(active) => active,
        Err(e) => {
            log_warning!("Saved override is unreadable: {e:#}");
            None
        }
    };

    let config = config::load()?;
    let (_, schedule) = load_configured_schedule(&config)?;
    let (date, weekday, time) = schedule.localize(crate::time::source::now());
    let resolution = resolve(&schedule, active.as_ref(), date, weekday, time);

    log_block_start!(
        "{} {}: {} from {}",
        weekday_name(weekday),
        time.format("%H:%M"),
        resolution.mode,
        resolution.source
    );
    if let Some(active) = &active
        && !resolution.clear_override
    {
        log_indented!("Override {} set on {}", active.block, active.date);
    }

    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("status - Show the blind's persisted state");
    log_block_start!("Usage: tiltr status");
    log_block_start!("Description:");
    log_indented!("Prints whether the daemon is running, the persisted slat angle,");
    log_indented!("any saved override and the mode governing the current minute.");
    log_end!();
}
