//! The control loop.
//!
//! [`Core`] owns the [`Controller`] and is the only place its state changes.
//! It runs a resolution pass every `tick_interval` seconds and, between
//! passes, waits on the signal channel for reloads, requests and intents.
//! A failed pass is logged and the loop carries on with the next one.

pub mod controller;
pub mod intent;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::common::utils::private_path;
use crate::io::lock::LockFile;
use crate::io::signals::{SignalMessage, SignalState};
use crate::schedule::BlindMode;
use crate::state::{self, StatePaths};
use crate::time::source::TimeSource;

pub use controller::{Controller, ControllerParts, Status, TickOutcome};
pub use intent::{ControllerHandle, Intent};

pub struct CoreParams {
    pub controller: Controller,
    pub signal_state: SignalState,
    pub tick_interval: Duration,
    pub schedule_path: PathBuf,
    /// Default mode used when a reload finds no schedule file.
    pub fallback_mode: BlindMode,
    pub fallback_timezone: Option<chrono_tz::Tz>,
    pub state: StatePaths,
    pub lock: Option<LockFile>,
}

pub struct Core {
    controller: Controller,
    signal_state: SignalState,
    tick_interval: Duration,
    schedule_path: PathBuf,
    fallback_mode: BlindMode,
    fallback_timezone: Option<chrono_tz::Tz>,
    state: StatePaths,
    _lock: Option<LockFile>,
    next_tick: DateTime<Utc>,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        Self {
            controller: params.controller,
            signal_state: params.signal_state,
            tick_interval: params.tick_interval,
            schedule_path: params.schedule_path,
            fallback_mode: params.fallback_mode,
            fallback_timezone: params.fallback_timezone,
            state: params.state,
            _lock: params.lock,
            next_tick: crate::time::source::now(),
        }
    }

    /// Run until shutdown (or the end of a simulation) and return the controller.
    pub fn execute(mut self) -> Result<Controller> {
        log_block_start!(
            "Resolving every {} seconds",
            self.tick_interval.as_secs()
        );
        self.run_tick();

        while self.signal_state.is_running() && !crate::time::source::simulation_ended() {
            match self.wait_for_message() {
                Ok(message) => self.handle_message(message),
                Err(RecvTimeoutError::Timeout) => self.run_tick(),
                Err(RecvTimeoutError::Disconnected) => {
                    log_error!("Signal channel disconnected; stopping");
                    self.signal_state.stop();
                }
            }
        }

        log_block_start!("Shutting down");
        log_indented!("{}", self.controller.status());
        log_end!();
        Ok(self.controller)
    }

    fn run_tick(&mut self) {
        if let Err(e) = self.controller.tick() {
            log_error!("Resolution pass failed: {e:#}");
            log_indented!("Keeping the current position until the next pass");
        }
        self.next_tick = crate::time::source::now()
            + chrono::Duration::from_std(self.tick_interval).unwrap_or(chrono::Duration::MAX);
    }

    /// Block until a message arrives or the next tick is due.
    fn wait_for_message(&self) -> Result<SignalMessage, RecvTimeoutError> {
        let remaining = (self.next_tick - crate::time::source::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if remaining.is_zero() {
            return Err(RecvTimeoutError::Timeout);
        }

        if !crate::time::source::is_simulated() {
            return self.signal_state.signal_receiver.recv_timeout(remaining);
        }

        wait_simulated(
            &self.signal_state.signal_receiver,
            crate::time::source::current(),
            remaining,
        )
    }

    fn handle_message(&mut self, message: SignalMessage) {
        let intent = match message {
            SignalMessage::Shutdown => {
                self.signal_state.stop();
                return;
            }
            SignalMessage::Intent(intent) => intent,
            SignalMessage::Reload => match state::load_schedule(
                &self.schedule_path,
                self.fallback_mode,
                self.fallback_timezone,
            ) {
                Ok(schedule) => Intent::ReplaceSchedule {
                    schedule,
                    force_update: true,
                },
                Err(e) => {
                    log_error!(
                        "Failed to reload {}: {e:#}",
                        private_path(&self.schedule_path)
                    );
                    log_indented!("Keeping the current schedule");
                    return;
                }
            },
            SignalMessage::Request => match state::take_request(&self.state) {
                Ok(Some(request)) => match Intent::try_from(request) {
                    Ok(intent) => intent,
                    Err(e) => {
                        log_error!("Rejected request: {e:#}");
                        return;
                    }
                },
                Ok(None) => {
                    log_warning!("Received SIGUSR1 without a pending request");
                    return;
                }
                Err(e) => {
                    log_error!("Failed to read request: {e:#}");
                    return;
                }
            },
        };

        let description = intent.describe();
        match self.controller.apply(intent) {
            Ok(true) => self.run_tick(),
            Ok(false) => {}
            Err(e) => log_error!("Failed to {description}: {e:#}"),
        }
    }
}

/// Wait out `remaining` of simulated time while polling `receiver`.
///
/// The sleeper is always joined so its span is added to the clock once, even
/// when a message ends the wait early.
fn wait_simulated(
    receiver: &Receiver<SignalMessage>,
    clock: Arc<dyn TimeSource>,
    remaining: Duration,
) -> Result<SignalMessage, RecvTimeoutError> {
    let sleeper = std::thread::spawn(move || clock.sleep(remaining));
    let result = loop {
        match receiver.recv_timeout(Duration::from_millis(10)) {
            Ok(message) => break Ok(message),
            Err(RecvTimeoutError::Timeout) if !sleeper.is_finished() => continue,
            Err(e) => break Err(e),
        }
    };
    let _ = sleeper.join();
    result
}
