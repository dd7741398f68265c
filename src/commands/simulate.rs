//! `tiltr simulate`: run the daemon against an accelerated clock.
//!
//! Times are read in the schedule's timezone (or the configured one, or the
//! system's). The run takes no lock and writes no state, so a real daemon can keep going.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;

use crate::Tiltr;
use crate::config;
use crate::logger::Log;
use crate::time::source::{self, SimulatedTimeSource};

use super::load_configured_schedule;

/// Default acceleration when no multiplier is given.
pub const DEFAULT_MULTIPLIER: f64 = 3600.0;

pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    debug_enabled: bool,
    log_to_file: bool,
) -> Result<()> {
    let timezone = match config::load() {
        Ok(config) => match load_configured_schedule(&config) {
            Ok((_, schedule)) => schedule.timezone().or(config.timezone()),
            Err(_) => config.timezone(),
        },
        Err(_) => None,
    };

    let start = source::parse_datetime(start_time, timezone).context("Invalid start time")?;
    let end = source::parse_datetime(end_time, timezone).context("Invalid end time")?;
    if end <= start {
        bail!("End time must be after start time");
    }

    source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end, multiplier)));
    Log::set_schedule_timezone(timezone);

    let _log_guard = if log_to_file {
        let path = format!(
            "tiltr-simulation-{}.log",
            Local::now().format("%Y%m%d-%H%M%S")
        );
        let guard = Log::start_file_logging(path.clone())?;
        eprintln!("Writing simulation output to {path}");
        Some(guard)
    } else {
        None
    };

    log_version!();
    log_block_start!("Simulation Mode");
    let duration = end - start;
    log_decorated!(
        "Simulating {} hours {} minutes",
        duration.num_hours(),
        duration.num_minutes() % 60
    );
    if multiplier > 0.0 {
        log_indented!(
            "Time acceleration: {}x (about {:.1} seconds)",
            multiplier as u64,
            duration.num_seconds() as f64 / multiplier
        );
    } else {
        log_indented!("Time acceleration: fast-forward");
    }

    Tiltr::new(debug_enabled)
        .without_lock()
        .without_headers()
        .in_memory()
        .run()
}

pub fn display_help() {
    log_version!();
    log_block_start!("simulate - Run the schedule on an accelerated clock");
    log_block_start!("Usage: tiltr simulate <START> <END> [MULTIPLIER] [--log]");
    log_block_start!("Arguments:");
    log_indented!("START, END   \"YYYY-MM-DD HH:MM:SS\" or \"HH:MM\" (today)");
    log_indented!("MULTIPLIER   Time acceleration, default 3600; 0 fast-forwards");
    log_block_start!("Options:");
    log_indented!("--log        Also write the output to tiltr-simulation-<time>.log");
    log_block_start!("Examples:");
    log_indented!("tiltr simulate \"2024-06-03 06:00:00\" \"2024-06-03 22:00:00\"");
    log_indented!("tiltr simulate 08:00 18:00 0");
    log_end!();
}
