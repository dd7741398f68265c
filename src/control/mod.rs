//! Precedence between the manual override, the schedule and the default.
//!
//! [`resolve`] is pure: it looks at the schedule and the active override for
//! one local instant and reports which of them governs. Side effects (clearing
//! an expired override, moving the motor) belong to [`crate::core::Controller`].

pub mod policy;

use std::fmt;

use chrono::{NaiveDate, NaiveTime, Weekday};

use crate::schedule::{BlindMode, BlockPosition, Schedule, TimeBlock};

/// Where the governing mode came from on a given tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Override,
    Scheduled,
    Default,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Override => "override",
            Source::Scheduled => "scheduled block",
            Source::Default => "default",
        })
    }
}

/// The outcome of one resolution pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub source: Source,
    pub mode: BlindMode,
    /// The active override has run out and should be dropped.
    pub clear_override: bool,
}

/// A manual override together with the local date it was projected on.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveOverride {
    pub block: TimeBlock,
    pub date: NaiveDate,
}

impl ActiveOverride {
    pub fn new(block: TimeBlock, date: NaiveDate) -> Self {
        Self { block, date }
    }

    /// Classify a local instant. Any date after the projection date is `After`.
    pub fn classify(&self, date: NaiveDate, time: NaiveTime) -> BlockPosition {
        if date > self.date {
            BlockPosition::After
        } else if date < self.date {
            BlockPosition::Before
        } else {
            self.block.classify(time)
        }
    }
}

/// Decide what governs `time` on `date` (a `weekday`).
pub fn resolve(
    schedule: &Schedule,
    active: Option<&ActiveOverride>,
    date: NaiveDate,
    weekday: Weekday,
    time: NaiveTime,
) -> Resolution {
    let mut clear_override = false;

    if let Some(active) = active {
        match active.classify(date, time) {
            BlockPosition::Within => {
                return Resolution {
                    source: Source::Override,
                    mode: active.block.mode(),
                    clear_override: false,
                };
            }
            BlockPosition::After => clear_override = true,
            // Overrides start at "now"; a clock stepping backwards lands here.
            BlockPosition::Before => {}
        }
    }

    match schedule.block_at(weekday, time) {
        Some(block) => Resolution {
            source: Source::Scheduled,
            mode: block.mode(),
            clear_override,
        },
        None => Resolution {
            source: Source::Default,
            mode: schedule.default_mode(),
            clear_override,
        },
    }
}
