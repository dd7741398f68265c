//! `tiltr` binary: parse arguments and dispatch.

use anyhow::Result;

use tiltr::args::{self, CliAction, ParsedArgs};
use tiltr::common::constants::EXIT_FAILURE;
use tiltr::{Tiltr, commands, config};
use tiltr::{log_block_start, log_end, log_error_exit, log_pipe};

fn main() -> Result<()> {
    let parsed = ParsedArgs::from_env();
    config::set_config_dir(parsed.config_dir.clone())?;
    let debug_enabled = parsed.debug_enabled;

    match parsed.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::Help(command) => commands::help::run_help_command(command.as_deref()),
        CliAction::UsageError { command, message } => {
            log_pipe!();
            log_error_exit!("{message}");
            commands::help::show_command_usage(command.as_deref().unwrap_or_default());
            log_block_start!("Try 'tiltr --help' for more information");
            log_end!();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run => Tiltr::new(debug_enabled).run(),
        CliAction::Schedule(action) => {
            commands::schedule::handle_schedule_command(action, debug_enabled)
        }
        CliAction::Override(action) => {
            commands::overrides::handle_override_command(action, debug_enabled)
        }
        CliAction::Calibrate => commands::calibrate::handle_calibrate_command(debug_enabled),
        CliAction::Status => commands::status::handle_status_command(debug_enabled),
        CliAction::Reload => commands::reload::handle_reload_command(debug_enabled),
        CliAction::Stop => commands::stop::handle_stop_command(debug_enabled),
        CliAction::Simulate {
            start_time,
            end_time,
            multiplier,
            log_to_file,
        } => commands::simulate::handle_simulate_command(
            &start_time,
            &end_time,
            multiplier,
            debug_enabled,
            log_to_file,
        ),
    }
}
