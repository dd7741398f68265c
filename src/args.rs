//! Command-line argument parsing.
//!
//! Global flags (`--debug`, `--config DIR`, `--help`, `--version`) may appear
//! anywhere. The first positional argument selects the command; with none,
//! the daemon runs.

use crate::commands::overrides::OverrideAction;
use crate::commands::schedule::ScheduleAction;
use crate::commands::simulate::DEFAULT_MULTIPLIER;

#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon.
    Run,
    Schedule(ScheduleAction),
    Override(OverrideAction),
    Calibrate,
    Status,
    Reload,
    Stop,
    Simulate {
        start_time: String,
        end_time: String,
        multiplier: f64,
        log_to_file: bool,
    },
    /// `tiltr help [COMMAND]`
    Help(Option<String>),
    ShowHelp,
    ShowVersion,
    /// Bad arguments; show usage for `command` (if known) and exit non-zero.
    UsageError {
        command: Option<String>,
        message: String,
    },
}

#[derive(Debug, PartialEq)]
pub struct ParsedArgs {
    pub action: CliAction,
    pub debug_enabled: bool,
    pub config_dir: Option<String>,
}

#[derive(Default)]
struct Flags {
    debug: bool,
    help: bool,
    version: bool,
    log: bool,
    no_update: bool,
    config_dir: Option<String>,
}

fn usage_error(command: Option<&str>, message: impl Into<String>) -> CliAction {
    CliAction::UsageError {
        command: command.map(str::to_string),
        message: message.into(),
    }
}

/// Negative numbers (`-50`) are positional, not flags.
fn is_flag(arg: &str) -> bool {
    arg.starts_with('-') && arg.parse::<f64>().is_err()
}

impl ParsedArgs {
    /// Parse arguments, `args[0]` being the program name.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = Flags::default();
        let mut positionals: Vec<String> = Vec::new();
        let mut error: Option<CliAction> = None;

        let mut iter = args.into_iter().skip(1).map(|s| s.as_ref().to_string());
        while let Some(arg) = iter.next() {
            if !is_flag(&arg) {
                positionals.push(arg);
                continue;
            }
            match arg.as_str() {
                "--debug" | "-d" => flags.debug = true,
                "--help" | "-h" => flags.help = true,
                "--version" | "-V" | "-v" => flags.version = true,
                "--log" => flags.log = true,
                "--no-update" => flags.no_update = true,
                "--config" | "-c" => match iter.next() {
                    Some(dir) => flags.config_dir = Some(dir),
                    None => {
                        error.get_or_insert(usage_error(None, "--config requires a directory"));
                    }
                },
                other => {
                    error.get_or_insert(usage_error(None, format!("Unknown option: {other}")));
                }
            }
        }

        let action = if flags.version {
            CliAction::ShowVersion
        } else if flags.help {
            match positionals.first() {
                Some(command) => CliAction::Help(Some(command.clone())),
                None => CliAction::ShowHelp,
            }
        } else if let Some(error) = error {
            error
        } else {
            parse_command(&positionals, &flags)
        };

        ParsedArgs {
            action,
            debug_enabled: flags.debug,
            config_dir: flags.config_dir,
        }
    }

    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

fn parse_command(positionals: &[String], flags: &Flags) -> CliAction {
    let Some((command, rest)) = positionals.split_first() else {
        return CliAction::Run;
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
    let force_update = !flags.no_update;

    match (command.as_str(), rest.as_slice()) {
        ("run", []) => CliAction::Run,
        ("schedule", ["check", file]) => CliAction::Schedule(ScheduleAction::Check(file.to_string())),
        ("schedule", ["install", file]) => {
            CliAction::Schedule(ScheduleAction::Install(file.to_string()))
        }
        ("schedule", ["clear"]) => CliAction::Schedule(ScheduleAction::Clear),
        ("schedule", ["show"] | []) => CliAction::Schedule(ScheduleAction::Show),
        ("override", ["clear"]) => CliAction::Override(OverrideAction::Clear { force_update }),
        ("override", [mode, duration, position @ ..]) if position.len() <= 1 => {
            let Ok(duration) = duration.parse::<i64>() else {
                return usage_error(Some("override"), format!("Invalid duration: {duration}"));
            };
            let position = match position.first().map(|p| p.parse::<i64>()) {
                None => None,
                Some(Ok(value)) => Some(value),
                Some(Err(_)) => {
                    return usage_error(
                        Some("override"),
                        format!("Invalid position: {}", position[0]),
                    );
                }
            };
            CliAction::Override(OverrideAction::Set {
                mode: mode.to_string(),
                duration,
                position,
                force_update,
            })
        }
        ("calibrate", []) => CliAction::Calibrate,
        ("status", []) => CliAction::Status,
        ("reload", []) => CliAction::Reload,
        ("stop", []) => CliAction::Stop,
        ("simulate", [start, end, multiplier @ ..]) if multiplier.len() <= 1 => {
            let multiplier = match multiplier.first().map(|m| m.parse::<f64>()) {
                None => DEFAULT_MULTIPLIER,
                Some(Ok(value)) if value >= 0.0 => value,
                _ => {
                    return usage_error(
                        Some("simulate"),
                        format!("Invalid multiplier: {}", multiplier[0]),
                    );
                }
            };
            CliAction::Simulate {
                start_time: start.to_string(),
                end_time: end.to_string(),
                multiplier,
                log_to_file: flags.log,
            }
        }
        ("help", []) => CliAction::Help(None),
        ("help", [topic]) => CliAction::Help(Some(topic.to_string())),
        (
            known @ ("run" | "schedule" | "override" | "calibrate" | "status" | "reload" | "stop"
            | "simulate" | "help"),
            _,
        ) => usage_error(Some(known), format!("Invalid arguments for '{known}'")),
        (unknown, _) => usage_error(None, format!("Unknown command: {unknown}")),
    }
}

pub fn display_version_info() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_end!();
}

pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("tiltr [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use a custom configuration directory");
    log_indented!("-d, --debug            Log every motor command");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("schedule <action>      check FILE, install FILE, clear, show");
    log_indented!("override <mode> <min>  Temporarily replace the scheduled mode");
    log_indented!("override clear         Drop the active override");
    log_indented!("calibrate              Declare the current slat angle to be 0°");
    log_indented!("status                 Show the persisted state");
    log_indented!("reload                 Make the daemon re-read its schedule");
    log_indented!("stop                   Terminate the running daemon");
    log_indented!("simulate <start> <end> Run the schedule on an accelerated clock");
    log_indented!("help [command]         Detailed help for a command");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(args: &[&str]) -> CliAction {
        ParsedArgs::parse(std::iter::once("tiltr").chain(args.iter().copied())).action
    }

    #[test]
    fn test_parse_no_args_runs_daemon() {
        let parsed = ParsedArgs::parse(["tiltr"]);
        assert_eq!(
            parsed,
            ParsedArgs {
                action: CliAction::Run,
                debug_enabled: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_global_flags_anywhere() {
        let parsed = ParsedArgs::parse(["tiltr", "status", "-d", "--config", "/tmp/blinds"]);
        assert_eq!(parsed.action, CliAction::Status);
        assert!(parsed.debug_enabled);
        assert_eq!(parsed.config_dir.as_deref(), Some("/tmp/blinds"));
    }

    #[test]
    fn test_config_without_value() {
        assert!(matches!(action(&["--config"]), CliAction::UsageError { .. }));
    }

    #[test]
    fn test_help_and_version_take_precedence() {
        assert_eq!(action(&["--version", "status"]), CliAction::ShowVersion);
        assert_eq!(action(&["-h"]), CliAction::ShowHelp);
        assert_eq!(
            action(&["override", "--help"]),
            CliAction::Help(Some("override".into()))
        );
    }

    #[test]
    fn test_schedule_actions() {
        assert_eq!(
            action(&["schedule", "install", "week.json"]),
            CliAction::Schedule(ScheduleAction::Install("week.json".into()))
        );
        assert_eq!(
            action(&["schedule", "check", "week.json"]),
            CliAction::Schedule(ScheduleAction::Check("week.json".into()))
        );
        assert_eq!(
            action(&["schedule", "clear"]),
            CliAction::Schedule(ScheduleAction::Clear)
        );
        assert_eq!(
            action(&["schedule"]),
            CliAction::Schedule(ScheduleAction::Show)
        );
        assert!(matches!(
            action(&["schedule", "install"]),
            CliAction::UsageError { command: Some(c), .. } if c == "schedule"
        ));
    }

    #[test]
    fn test_override_with_negative_position() {
        assert_eq!(
            action(&["override", "MANUAL", "30", "-50"]),
            CliAction::Override(OverrideAction::Set {
                mode: "MANUAL".into(),
                duration: 30,
                position: Some(-50),
                force_update: true,
            })
        );
    }

    #[test]
    fn test_override_no_update_and_clear() {
        assert_eq!(
            action(&["override", "dark", "60", "--no-update"]),
            CliAction::Override(OverrideAction::Set {
                mode: "dark".into(),
                duration: 60,
                position: None,
                force_update: false,
            })
        );
        assert_eq!(
            action(&["override", "clear"]),
            CliAction::Override(OverrideAction::Clear { force_update: true })
        );
        assert!(matches!(
            action(&["override", "DARK", "soon"]),
            CliAction::UsageError { .. }
        ));
    }

    #[test]
    fn test_simulate_defaults_and_log_flag() {
        assert_eq!(
            action(&["simulate", "08:00", "18:00"]),
            CliAction::Simulate {
                start_time: "08:00".into(),
                end_time: "18:00".into(),
                multiplier: DEFAULT_MULTIPLIER,
                log_to_file: false,
            }
        );
        assert_eq!(
            action(&["simulate", "08:00", "18:00", "0", "--log"]),
            CliAction::Simulate {
                start_time: "08:00".into(),
                end_time: "18:00".into(),
                multiplier: 0.0,
                log_to_file: true,
            }
        );
        assert!(matches!(
            action(&["simulate", "08:00", "18:00", "-2"]),
            CliAction::UsageError { .. }
        ));
    }

    #[test]
    fn test_unknown_command_and_option() {
        assert!(matches!(
            action(&["open"]),
            CliAction::UsageError { command: None, .. }
        ));
        assert!(matches!(
            action(&["--fast"]),
            CliAction::UsageError { command: None, .. }
        ));
    }
}
