//! `tiltr stop`: terminate the running daemon and wait for it to exit.

use std::time::Duration;

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::common::utils::is_process_running;

use super::{daemon_pid, signal_daemon};

const STOP_TIMEOUT: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn handle_stop_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let Some(pid) = daemon_pid() else {
        log_error_exit!("tiltr isn't running");
        std::process::exit(crate::common::constants::EXIT_FAILURE);
    };

    log_block_start!("Stopping tiltr (PID: {pid})...");
    signal_daemon(pid, Signal::SIGTERM)?;
    if debug_enabled {
        log_debug!("SIGTERM sent to process {pid}");
    }

    let attempts = STOP_TIMEOUT.as_millis() / POLL_INTERVAL.as_millis();
    for _ in 0..attempts {
        if !is_process_running(pid) {
            log_info!("Process terminated");
            log_end!();
            return Ok(());
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    log_warning!("Process did not terminate within {} seconds", STOP_TIMEOUT.as_secs());
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("stop - Terminate the running daemon");
    log_block_start!("Usage: tiltr stop");
    log_block_start!("Description:");
    log_indented!("The blind stays where it is; the angle is already persisted.");
    log_end!();
}
