//! `tiltr calibrate`: declare the slats' current physical position to be 0°.
//!
//! Nothing moves. Use it after levelling the slats by hand or after the
//! persisted angle was lost.

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::state::angle::{AngleStore, FileAngleStore};
use crate::state::{self, Request, StatePaths};

use super::{daemon_pid, signal_daemon};

pub fn handle_calibrate_command(debug_enabled: bool) -> Result<()> {
    log_version!();
    let paths = StatePaths::current()?;

    match daemon_pid() {
        Some(pid) => {
            state::write_request(&paths, &Request::Calibrate)?;
            signal_daemon(pid, Signal::SIGUSR1)?;
            log_block_start!("Sent calibrate request to tiltr (PID: {pid})");
        }
        None => {
            let mut store = FileAngleStore::new(paths.angle());
            // A corrupted file is overwritten; the old value is informational.
            let previous = store.get().ok();
            store.set(0.0)?;
            log_block_start!("Calibrated: current slat position is now 0°");
            if debug_enabled && let Some(previous) = previous {
                log_debug!("Previous persisted angle was {previous:.1}°");
            }
        }
    }

    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("calibrate - Reset the persisted slat angle to 0°");
    log_block_start!("Usage: tiltr calibrate");
    log_block_start!("Description:");
    log_indented!("Level the slats by hand first. The motor does not move;");
    log_indented!("only the stored angle and the daemon's cached position change.");
    log_end!();
}
