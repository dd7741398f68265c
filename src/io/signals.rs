//! Unix signal handling for the daemon.
//!
//! | Signal            | Meaning                                      |
//! |-------------------|----------------------------------------------|
//! | SIGTERM/INT/HUP   | shut down                                    |
//! | SIGUSR1           | apply the pending `request.json`             |
//! | SIGUSR2           | reload the schedule file                     |
//!
//! Signals are turned into [`SignalMessage`]s on the control loop's channel,
//! the same channel in-process callers use through
//! [`ControllerHandle`](crate::core::ControllerHandle).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;

use crate::core::{ControllerHandle, Intent};

#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    /// Re-read the schedule file (SIGUSR2).
    Reload,
    /// Consume `request.json` (SIGUSR1).
    Request,
    Shutdown,
    /// Sent in-process through a [`ControllerHandle`].
    Intent(Intent),
}

pub struct SignalState {
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    pub signal_sender: Sender<SignalMessage>,
}

impl SignalState {
    /// A channel with no OS signals attached.
    pub fn detached() -> Self {
        let (signal_sender, signal_receiver) = std::sync::mpsc::channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal_receiver,
            signal_sender,
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle::new(self.signal_sender.clone())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Register signal handlers and forward them to the returned state's channel.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let state = SignalState::detached();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running = state.running.clone();
    let sender = state.signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            let message = match sig {
                SIGUSR1 => SignalMessage::Request,
                SIGUSR2 => SignalMessage::Reload,
                _ => {
                    running.store(false, Ordering::SeqCst);
                    SignalMessage::Shutdown
                }
            };
            if debug_enabled {
                log_debug!("Received signal {sig}: {message:?}");
            }
            if sender.send(message).is_err() {
                break;
            }
        }
    });

    Ok(state)
}
