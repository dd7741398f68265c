//! Manual commands and their projection onto an override block anchored at "now".

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::BlindMode;
use super::block::{TimeBlock, end_of_day, truncate_to_minute};
use crate::error::{BlindsError, BlindsResult};

/// A request to hold a mode for `duration` minutes (0 = rest of the day).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    mode: BlindMode,
    duration: u32,
}

/// Serialized form of a [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub mode: String,
    pub duration: i64,
    #[serde(default)]
    pub position: Option<i64>,
}

impl Command {
    pub fn new(mode: BlindMode, duration: i64) -> BlindsResult<Self> {
        let duration = u32::try_from(duration).map_err(|_| {
            BlindsError::InvalidCommand(format!("duration {duration} is not a valid minute count"))
        })?;
        Ok(Self { mode, duration })
    }

    pub fn from_parts(mode: &str, duration: i64, position: Option<i64>) -> BlindsResult<Self> {
        let mode = BlindMode::from_parts(mode, position)
            .map_err(|e| BlindsError::InvalidCommand(e.to_string()))?;
        Self::new(mode, duration)
    }

    pub fn mode(&self) -> BlindMode {
        self.mode
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Project onto a block starting at `now()`.
    ///
    /// A zero duration or one that runs past the end of the day ends at 23:59.
    /// Returns `None` when the block would be empty, which only happens when
    /// `now()` is already 23:59.
    pub fn to_time_block(&self, now: impl FnOnce() -> NaiveTime) -> Option<TimeBlock> {
        let start = truncate_to_minute(now());
        let end = if self.duration == 0 {
            end_of_day()
        } else {
            let total_minutes = start.minute().saturating_add(self.duration);
            let hour = start.hour() + total_minutes / 60;
            if hour > 23 {
                end_of_day()
            } else {
                NaiveTime::from_hms_opt(hour, total_minutes % 60, 0)?
            }
        };

        if end <= start {
            return None;
        }
        TimeBlock::new(start, end, self.mode).ok()
    }

    pub fn to_record(&self) -> CommandRecord {
        CommandRecord {
            mode: self.mode.name().to_string(),
            duration: i64::from(self.duration),
            position: self.mode.position().map(i64::from),
        }
    }

    pub fn from_record(record: &CommandRecord) -> BlindsResult<Self> {
        Self::from_parts(&record.mode, record.duration, record.position)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.to_record()).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> BlindsResult<Self> {
        let record: CommandRecord = serde_json::from_value(value)
            .map_err(|e| BlindsError::InvalidCommand(e.to_string()))?;
        Self::from_record(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_manual_command_projects_from_now() {
        let command = Command::from_parts("MANUAL", 120, Some(70)).unwrap();
        let block = command.to_time_block(|| t(16, 31)).unwrap();
        assert_eq!(block.start(), t(16, 31));
        assert_eq!(block.end(), t(18, 31));
        assert_eq!(block.position(), Some(70));
    }

    #[test]
    fn test_minutes_carry_into_hours() {
        let command = Command::new(BlindMode::Dark, 45).unwrap();
        let block = command.to_time_block(|| t(9, 50)).unwrap();
        assert_eq!(block.end(), t(10, 35));
    }

    #[test]
    fn test_zero_duration_runs_to_end_of_day() {
        let command = Command::new(BlindMode::Light, 0).unwrap();
        let block = command.to_time_block(|| t(7, 0)).unwrap();
        assert_eq!(block.end(), end_of_day());
    }

    #[test]
    fn test_overflow_clamps_to_end_of_day() {
        let command = Command::new(BlindMode::Eco, 90).unwrap();
        let block = command.to_time_block(|| t(23, 0)).unwrap();
        assert_eq!(block.end(), end_of_day());

        let long = Command::new(BlindMode::Eco, 10_000).unwrap();
        assert_eq!(long.to_time_block(|| t(1, 0)).unwrap().end(), end_of_day());
    }

    #[test]
    fn test_now_is_truncated_to_minute() {
        let command = Command::new(BlindMode::Dark, 10).unwrap();
        let block = command
            .to_time_block(|| NaiveTime::from_hms_opt(12, 0, 42).unwrap())
            .unwrap();
        assert_eq!(block.start(), t(12, 0));
        assert_eq!(block.end(), t(12, 10));
    }

    #[test]
    fn test_end_of_day_yields_no_block() {
        for duration in [0, 1, 30, 600] {
            let command = Command::new(BlindMode::Dark, duration).unwrap();
            assert_eq!(command.to_time_block(|| t(23, 59)), None);
        }
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Command::new(BlindMode::Dark, -1),
            Err(BlindsError::InvalidCommand(_))
        ));
        assert!(matches!(
            Command::from_parts("MANUAL", 10, None),
            Err(BlindsError::InvalidCommand(_))
        ));
        assert!(matches!(
            Command::from_parts("MANUAL", 10, Some(-101)),
            Err(BlindsError::InvalidCommand(_))
        ));
        assert!(matches!(
            Command::from_parts("WINDY", 10, None),
            Err(BlindsError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_json_records() {
        let command = Command::from_json(json!({"mode": "MANUAL", "duration": 30, "position": -20}))
            .unwrap();
        assert_eq!(command.duration(), 30);
        assert_eq!(
            command.to_json(),
            json!({"mode": "MANUAL", "duration": 30, "position": -20})
        );

        let err = Command::from_json(json!({"mode": "DARK"})).unwrap_err();
        match err {
            BlindsError::InvalidCommand(message) => assert!(message.contains("duration")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
