//! `tiltr help [COMMAND]`.

use anyhow::Result;

/// One-line usage for a command, shown after an argument error.
pub fn show_command_usage(command: &str) {
    match command {
        "schedule" => {
            log_block_start!("Usage: tiltr schedule <check FILE | install FILE | clear | show>")
        }
        "override" => log_block_start!(
            "Usage: tiltr override <MODE> <MINUTES> [POSITION] | tiltr override clear"
        ),
        "calibrate" => log_block_start!("Usage: tiltr calibrate"),
        "status" => log_block_start!("Usage: tiltr status"),
        "reload" => log_block_start!("Usage: tiltr reload"),
        "stop" => log_block_start!("Usage: tiltr stop"),
        "simulate" => log_block_start!("Usage: tiltr simulate <START> <END> [MULTIPLIER]"),
        _ => log_block_start!("Usage: tiltr [OPTIONS] [COMMAND]"),
    }
}

pub fn run_help_command(command: Option<&str>) -> Result<()> {
    match command {
        None => display_general_help(),
        Some("schedule") => super::schedule::display_help(),
        Some("override") => super::overrides::display_help(),
        Some("calibrate") => super::calibrate::display_help(),
        Some("status") => super::status::display_help(),
        Some("reload") => super::reload::display_help(),
        Some("stop") => super::stop::display_help(),
        Some("simulate") => super::simulate::display_help(),
        Some("help") => display_help_help(),
        Some(unknown) => {
            log_warning!("Unknown command: {unknown}");
            display_general_help();
        }
    }
    Ok(())
}

fn display_general_help() {
    log_version!();
    log_block_start!("Available Commands:");
    log_indented!("schedule <action>        Check, install, clear or show the schedule");
    log_indented!("override <mode> <min>    Temporarily replace the scheduled mode");
    log_indented!("calibrate                Declare the current slat angle to be 0°");
    log_indented!("status                   Show the persisted state and current mode");
    log_indented!("reload                   Make the daemon re-read its schedule");
    log_indented!("stop                     Terminate the running daemon");
    log_indented!("simulate <start> <end>   Run the schedule on an accelerated clock");
    log_indented!("help [command]           Show detailed help for a command");
    log_pipe!();
    log_info!("Run 'tiltr' with no command to start the daemon.");
    log_end!();
}

fn display_help_help() {
    log_version!();
    log_block_start!("help - Display help information");
    log_block_start!("Usage: tiltr help [COMMAND]");
    log_block_start!("Examples:");
    log_indented!("tiltr help");
    log_indented!("tiltr help override");
    log_end!();
}
