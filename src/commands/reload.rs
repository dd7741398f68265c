//! `tiltr reload`: make the running daemon re-read its schedule file.

use anyhow::Result;
use nix::sys::signal::Signal;

use super::{daemon_pid, signal_daemon};

pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let Some(pid) = daemon_pid() else {
        log_error_exit!("tiltr isn't running");
        std::process::exit(crate::common::constants::EXIT_FAILURE);
    };

    signal_daemon(pid, Signal::SIGUSR2)?;
    log_block_start!("Signaled tiltr (PID: {pid}) to reload its schedule");
    if debug_enabled {
        log_pipe!();
        log_debug!("SIGUSR2 sent to process {pid}");
    }
    log_end!();
    Ok(())
}

pub fn display_help() {
    log_version!();
    log_block_start!("reload - Re-read the schedule file");
    log_block_start!("Usage: tiltr reload");
    log_block_start!("Description:");
    log_indented!("Sends SIGUSR2 to the running daemon. An invalid file is");
    log_indented!("rejected and the daemon keeps its current schedule.");
    log_end!();
}
