//! # tiltr
//!
//! Weekly-scheduled controller for a motorized venetian blind.
//!
//! The library backs the `tiltr` binary and its integration tests:
//!
//! - **Entry point**: [`Tiltr`] loads configuration and state and runs the daemon
//! - **Schedule**: `schedule` holds modes, time blocks, commands and the weekly programme
//! - **Control**: `control` resolves what governs a minute and turns modes into positions
//! - **Core**: `core` owns the controller and its tick loop
//! - **Motor**: `motor` maps angles to steps and drives the stepper
//! - **State**: `state` persists the angle, the active override and CLI requests
//! - **Infrastructure**: configuration, signals, locking, clock and logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod commands;
pub mod common;
pub mod config;
pub mod control;
pub mod core;
pub mod error;
pub mod geo;
pub mod io;
pub mod motor;
pub mod schedule;
pub mod sensors;
pub mod state;
pub mod time;

mod tiltr;

pub use tiltr::{Tiltr, build_policy};
