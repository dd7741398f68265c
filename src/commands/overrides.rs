//! `tiltr override`: set or clear a temporary override.
//!
//! With a daemon running the command becomes a `request.json` plus SIGUSR1 so
//! the daemon projects the override against its own clock. Otherwise the
//! override is projected here and saved where the daemon restores it on start.

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::config;
use crate::control::ActiveOverride;
use crate::schedule::{Command, format_clock};
use crate::state::{self, Request, StatePaths};

use super::{daemon_pid, load_configured_schedule, signal_daemon};

#[derive(Debug, Clone, PartialEq)]
pub enum OverrideAction {
    Set {
        mode: String,
        duration: i64,
        position: Option<i64>,
        force_update: bool,
    },
    Clear {
        force_update: bool,
    },
}

pub fn handle_override_command(action: OverrideAction, debug_enabled: bool) -> Result<()> {
    log_version!();
    let paths = StatePaths::current()?;

    let request = match action {
        OverrideAction::Set {
            mode,
            duration,
            position,
            force_update,
        } => {
            let command = Command::from_parts(&mode, duration, position)?;
            Request::SetOverride {
                command: command.to_record(),
                force_update,
            }
        }
        OverrideAction::Clear { force_update } => Request::ClearOverride { force_update },
    };

    match daemon_pid() {
        Some(pid) => {
            state::write_request(&paths, &request)?;
            signal_daemon(pid, Signal::SIGUSR1)?;
            log_block_start!("Sent override request to tiltr (PID: {pid})");
            if debug_enabled {
                log_debug!("Request written to {}", paths.request_file().display());
            }
        }
        None => apply_offline(&paths, request)?,
    }

    log_end!();
    Ok(())
}

fn apply_offline(paths: &StatePaths, request: Request) -> Result<()> {
    match request {
        Request::SetOverride { command, .. } => {
            let command = Command::from_record(&command)?;
            let config = config::load()?;
            let (_, schedule) = load_configured_schedule(&config)?;
            let (date, _, time) = schedule.localize(crate::time::source::now());
            match command.to_time_block(|| time) {
                Some(block) => {
                    state::save_override(paths, &ActiveOverride::new(block, date))?;
                    log_block_start!("Saved override {block}");
                    log_indented!("tiltr isn't running; the override applies on next start");
                }
                None => {
                    log_block_start!("Override starting at {} is empty", format_clock(time));
                    log_indented!("Nothing left of today to override");
                }
            }
        }
        Request::ClearOverride { .. } => {
            state::clear_override(paths)?;
            log_block_start!("Override cleared");
        }
        Request::Calibrate => {}
    }
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("override - Temporarily replace the scheduled mode");
    log_block_start!("Usage:");
    log_indented!("tiltr override <MODE> <MINUTES> [POSITION] [--no-update]");
    log_indented!("tiltr override clear [--no-update]");
    log_block_start!("Arguments:");
    log_indented!("MODE      LIGHT, DARK, ECO, BALANCED or MANUAL");
    log_indented!("MINUTES   How long the override lasts; it always ends by 23:59");
    log_indented!("POSITION  Required for MANUAL, -100 to 100");
    log_block_start!("Options:");
    log_indented!("--no-update  Do not move the blind until the next scheduled pass");
    log_block_start!("Examples:");
    log_indented!("tiltr override DARK 60");
    log_indented!("tiltr override MANUAL 30 50");
    log_end!();
}
