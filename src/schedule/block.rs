//! Time blocks: validated `[start, end)` intervals within a single day.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::BlindMode;
use crate::error::{BlindsError, BlindsResult};

/// Latest representable block end. A day's last block ends here, not at midnight.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default()
}

/// Drop seconds and sub-seconds.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time - Duration::seconds(i64::from(time.second()))
        - Duration::nanoseconds(i64::from(time.nanosecond()))
}

/// Parse `HH:MM` or `HH:MM:SS`; seconds are discarded.
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
        .map(truncate_to_minute)
}

/// Canonical `HH:MM` form.
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Where an instant falls relative to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPosition {
    Before,
    Within,
    After,
}

/// A behaviour mode applied over `[start, end)` on some day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBlock {
    start: NaiveTime,
    end: NaiveTime,
    mode: BlindMode,
}

/// Serialized form of a [`TimeBlock`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlockRecord {
    pub start: String,
    pub end: String,
    pub mode: String,
    #[serde(default)]
    pub position: Option<i64>,
}

impl TimeBlock {
    /// Construct a block, truncating both ends to the minute.
    pub fn new(start: NaiveTime, end: NaiveTime, mode: BlindMode) -> BlindsResult<Self> {
        let block = Self {
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
            mode,
        };
        block.validate()?;
        Ok(block)
    }

    /// Construct from a mode name and optional position.
    pub fn from_parts(
        start: NaiveTime,
        end: NaiveTime,
        mode: &str,
        position: Option<i64>,
    ) -> BlindsResult<Self> {
        let mode = BlindMode::from_parts(mode, position)
            .map_err(|e| BlindsError::InvalidTimeBlock(e.to_string()))?;
        Self::new(start, end, mode)
    }

    fn validate(&self) -> BlindsResult<()> {
        if self.start >= self.end {
            return Err(BlindsError::InvalidTimeBlock(format!(
                "start {} must be before end {}",
                format_clock(self.start),
                format_clock(self.end)
            )));
        }
        Ok(())
    }

    /// Overwrite the given fields and re-validate.
    ///
    /// The position is always overwritten, so keeping a MANUAL block requires
    /// passing its position again. On failure the block is left untouched.
    pub fn update(
        &mut self,
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
        mode: Option<&str>,
        position: Option<i64>,
    ) -> BlindsResult<()> {
        let mode = match mode {
            Some(name) => BlindMode::from_parts(name, position),
            None => BlindMode::from_parts(self.mode.name(), position),
        }
        .map_err(|e| BlindsError::InvalidTimeBlock(e.to_string()))?;

        let candidate = Self::new(
            start.unwrap_or(self.start),
            end.unwrap_or(self.end),
            mode,
        )?;
        *self = candidate;
        Ok(())
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn mode(&self) -> BlindMode {
        self.mode
    }

    pub fn position(&self) -> Option<i32> {
        self.mode.position()
    }

    /// Three-way comparison of `time` against `[start, end)`.
    pub fn classify(&self, time: NaiveTime) -> BlockPosition {
        let time = truncate_to_minute(time);
        if time < self.start {
            BlockPosition::Before
        } else if time < self.end {
            BlockPosition::Within
        } else {
            BlockPosition::After
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.classify(time) == BlockPosition::Within
    }

    pub fn to_record(&self) -> TimeBlockRecord {
        TimeBlockRecord {
            start: format_clock(self.start),
            end: format_clock(self.end),
            mode: self.mode.name().to_string(),
            position: self.position().map(i64::from),
        }
    }

    pub fn from_record(record: &TimeBlockRecord) -> BlindsResult<Self> {
        let start = parse_clock(&record.start).ok_or_else(|| {
            BlindsError::InvalidTimeBlock(format!("start '{}' is not HH:MM[:SS]", record.start))
        })?;
        let end = parse_clock(&record.end).ok_or_else(|| {
            BlindsError::InvalidTimeBlock(format!("end '{}' is not HH:MM[:SS]", record.end))
        })?;
        Self::from_parts(start, end, &record.mode, record.position)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.to_record()).unwrap_or(serde_json::Value::Null)
    }

    /// Parse a JSON object; a missing key is reported by name.
    pub fn from_json(value: serde_json::Value) -> BlindsResult<Self> {
        let record: TimeBlockRecord = serde_json::from_value(value)
            .map_err(|e| BlindsError::InvalidTimeBlock(e.to_string()))?;
        Self::from_record(&record)
    }
}

impl std::fmt::Display for TimeBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{} {}",
            format_clock(self.start),
            format_clock(self.end),
            self.mode
        )
    }
}
