//! Requests that mutate controller state.
//!
//! Only the loop that owns the [`Controller`](super::Controller) applies
//! intents. Everything else sends them over the loop's channel.

use std::sync::mpsc::Sender;

use anyhow::{Result, anyhow};

use crate::io::signals::SignalMessage;
use crate::schedule::{Command, Schedule};
use crate::state::Request;

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ReplaceSchedule { schedule: Schedule, force_update: bool },
    /// Empty every day, keeping the default.
    ClearSchedule { force_update: bool },
    SetOverride { command: Command, force_update: bool },
    ClearOverride { force_update: bool },
    /// Declare the current physical position to be 0° without moving.
    Calibrate,
}

impl Intent {
    /// Whether a resolution pass should follow immediately.
    pub fn force_update(&self) -> bool {
        match self {
            Intent::ReplaceSchedule { force_update, .. }
            | Intent::ClearSchedule { force_update }
            | Intent::SetOverride { force_update, .. }
            | Intent::ClearOverride { force_update } => *force_update,
            Intent::Calibrate => false,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Intent::ReplaceSchedule { .. } => "replace schedule",
            Intent::ClearSchedule { .. } => "clear schedule",
            Intent::SetOverride { .. } => "set override",
            Intent::ClearOverride { .. } => "clear override",
            Intent::Calibrate => "calibrate",
        }
    }
}

impl TryFrom<Request> for Intent {
    type Error = anyhow::Error;

    fn try_from(request: Request) -> Result<Self> {
        Ok(match request {
            Request::SetOverride {
                command,
                force_update,
            } => Intent::SetOverride {
                command: Command::from_record(&command)?,
                force_update,
            },
            Request::ClearOverride { force_update } => Intent::ClearOverride { force_update },
            Request::Calibrate => Intent::Calibrate,
        })
    }
}

/// Cloneable sender of intents into a running control loop.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    sender: Sender<SignalMessage>,
}

impl ControllerHandle {
    pub fn new(sender: Sender<SignalMessage>) -> Self {
        Self { sender }
    }

    pub fn submit(&self, intent: Intent) -> Result<()> {
        self.sender
            .send(SignalMessage::Intent(intent))
            .map_err(|_| anyhow!("control loop is no longer running"))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SignalMessage::Shutdown)
            .map_err(|_| anyhow!("control loop is no longer running"))
    }
}
