//! Weekly schedule: seven day buckets of non-overlapping blocks plus a default.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::block::{TimeBlock, TimeBlockRecord};
use super::BlindMode;
use crate::error::{BlindsError, BlindsResult};

/// Weekdays in record order, Sunday first. Index with `num_days_from_sunday`.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    }
}

/// First overlapping adjacent pair in a list sorted by start.
///
/// Back-to-back blocks (`next.start == previous.end`) do not overlap.
pub fn find_conflict(sorted: &[TimeBlock]) -> Option<(usize, usize)> {
    sorted
        .windows(2)
        .position(|pair| pair[1].start() < pair[0].end())
        .map(|i| (i, i + 1))
}

pub fn has_conflict(sorted: &[TimeBlock]) -> bool {
    find_conflict(sorted).is_some()
}

/// The blind's weekly programme.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    default_mode: BlindMode,
    days: [Vec<TimeBlock>; 7],
    timezone: Option<Tz>,
}

/// Serialized form of a [`Schedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(alias = "default")]
    pub default_mode: String,
    #[serde(default)]
    pub default_pos: Option<i64>,
    pub schedule: WeekRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeekRecord {
    pub sunday: Vec<TimeBlockRecord>,
    pub monday: Vec<TimeBlockRecord>,
    pub tuesday: Vec<TimeBlockRecord>,
    pub wednesday: Vec<TimeBlockRecord>,
    pub thursday: Vec<TimeBlockRecord>,
    pub friday: Vec<TimeBlockRecord>,
    pub saturday: Vec<TimeBlockRecord>,
}

impl WeekRecord {
    fn into_days(self) -> [Vec<TimeBlockRecord>; 7] {
        [
            self.sunday,
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
        ]
    }

    fn from_days(days: [Vec<TimeBlockRecord>; 7]) -> Self {
        let [sunday, monday, tuesday, wednesday, thursday, friday, saturday] = days;
        Self {
            sunday,
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
        }
    }
}

impl Default for Schedule {
    /// Dark all week with no blocks.
    fn default() -> Self {
        Self {
            default_mode: BlindMode::Dark,
            days: Default::default(),
            timezone: None,
        }
    }
}

impl Schedule {
    /// Build a schedule; `per_day`, when given, must name all seven weekdays.
    ///
    /// Runs validate, then sorts each day, then checks for conflicts.
    pub fn new(
        default_mode: BlindMode,
        per_day: Option<HashMap<Weekday, Vec<TimeBlock>>>,
    ) -> BlindsResult<Self> {
        let mut days: [Vec<TimeBlock>; 7] = Default::default();
        if let Some(mut per_day) = per_day {
            for day in WEEK {
                let blocks = per_day.remove(&day).ok_or_else(|| {
                    BlindsError::InvalidSchedule(format!("missing day '{}'", weekday_name(day)))
                })?;
                days[day.num_days_from_sunday() as usize] = blocks;
            }
        }

        let mut schedule = Self {
            default_mode,
            days,
            timezone: None,
        };
        schedule.sort_and_check()?;
        Ok(schedule)
    }

    /// Build from a default mode name and optional position.
    pub fn from_parts(
        default_mode: &str,
        default_position: Option<i64>,
        per_day: Option<HashMap<Weekday, Vec<TimeBlock>>>,
    ) -> BlindsResult<Self> {
        let mode = BlindMode::from_parts(default_mode, default_position)
            .map_err(|e| BlindsError::InvalidSchedule(format!("default: {e}")))?;
        Self::new(mode, per_day)
    }

    pub fn with_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    fn sort_and_check(&mut self) -> BlindsResult<()> {
        for day in WEEK {
            let blocks = &mut self.days[day.num_days_from_sunday() as usize];
            blocks.sort_by_key(|block| block.start());
            check_day(day, blocks)?;
        }
        Ok(())
    }

    /// Replace one day's blocks. The schedule is unchanged on error.
    pub fn replace_day(&mut self, day: Weekday, mut blocks: Vec<TimeBlock>) -> BlindsResult<()> {
        blocks.sort_by_key(|block| block.start());
        check_day(day, &blocks)?;
        self.days[day.num_days_from_sunday() as usize] = blocks;
        Ok(())
    }

    /// Empty every day, keeping the default and timezone.
    pub fn clear_all(&mut self) {
        for blocks in self.days.iter_mut() {
            blocks.clear();
        }
    }

    pub fn default_mode(&self) -> BlindMode {
        self.default_mode
    }

    pub fn default_position(&self) -> Option<i32> {
        self.default_mode.position()
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    pub fn blocks(&self, day: Weekday) -> &[TimeBlock] {
        &self.days[day.num_days_from_sunday() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    /// The block covering `time` on `day`, if any.
    pub fn block_at(&self, day: Weekday, time: NaiveTime) -> Option<&TimeBlock> {
        self.blocks(day).iter().find(|block| block.contains(time))
    }

    /// Calendar date, weekday and wall-clock time of `instant` in the schedule's zone.
    ///
    /// Without a configured zone the host's local time is used.
    pub fn localize(&self, instant: DateTime<Utc>) -> (NaiveDate, Weekday, NaiveTime) {
        use chrono::Datelike;
        let naive = match self.timezone {
            Some(tz) => instant.with_timezone(&tz).naive_local(),
            None => instant.with_timezone(&chrono::Local).naive_local(),
        };
        (naive.date(), naive.weekday(), naive.time())
    }

    pub fn to_record(&self) -> ScheduleRecord {
        let days = WEEK.map(|day| self.blocks(day).iter().map(TimeBlock::to_record).collect());
        ScheduleRecord {
            default_mode: self.default_mode.name().to_string(),
            default_pos: self.default_position().map(i64::from),
            schedule: WeekRecord::from_days(days),
            timezone: self.timezone.map(|tz| tz.name().to_string()),
        }
    }

    pub fn from_record(record: ScheduleRecord) -> BlindsResult<Self> {
        let timezone = match record.timezone.as_deref() {
            Some(name) => Some(name.parse::<Tz>().map_err(|_| {
                BlindsError::InvalidSchedule(format!("unknown timezone '{name}'"))
            })?),
            None => None,
        };

        let mut per_day = HashMap::new();
        for (day, records) in WEEK.into_iter().zip(record.schedule.into_days()) {
            let blocks = records
                .iter()
                .map(TimeBlock::from_record)
                .collect::<BlindsResult<Vec<_>>>()?;
            per_day.insert(day, blocks);
        }

        Ok(Self::from_parts(&record.default_mode, record.default_pos, Some(per_day))?
            .with_timezone(timezone))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.to_record()).unwrap_or(serde_json::Value::Null)
    }

    /// Parse a JSON document; structural problems are `InvalidSchedule`.
    pub fn from_json(value: serde_json::Value) -> BlindsResult<Self> {
        let record: ScheduleRecord = serde_json::from_value(value)
            .map_err(|e| BlindsError::InvalidSchedule(e.to_string()))?;
        Self::from_record(record)
    }

    pub fn from_json_str(text: &str) -> BlindsResult<Self> {
        let record: ScheduleRecord =
            serde_json::from_str(text).map_err(|e| BlindsError::InvalidSchedule(e.to_string()))?;
        Self::from_record(record)
    }
}

fn check_day(day: Weekday, sorted: &[TimeBlock]) -> BlindsResult<()> {
    match find_conflict(sorted) {
        Some((earlier, later)) => Err(BlindsError::SchedulingConflict {
            day: weekday_name(day).to_string(),
            earlier: sorted[earlier].to_string(),
            later: sorted[later].to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn block(start: NaiveTime, end: NaiveTime, mode: BlindMode) -> TimeBlock {
        TimeBlock::new(start, end, mode).unwrap()
    }

    fn week_with(day: Weekday, blocks: Vec<TimeBlock>) -> HashMap<Weekday, Vec<TimeBlock>> {
        let mut per_day: HashMap<_, _> = WEEK.iter().map(|d| (*d, Vec::new())).collect();
        per_day.insert(day, blocks);
        per_day
    }

    #[test]
    fn test_days_are_sorted_on_construction() {
        let per_day = week_with(
            Weekday::Mon,
            vec![
                block(t(18, 0), t(20, 0), BlindMode::Dark),
                block(t(6, 0), t(9, 0), BlindMode::Light),
            ],
        );
        let schedule = Schedule::new(BlindMode::Eco, Some(per_day)).unwrap();
        let starts: Vec<_> = schedule.blocks(Weekday::Mon).iter().map(|b| b.start()).collect();
        assert_eq!(starts, vec![t(6, 0), t(18, 0)]);
    }

    #[test]
    fn test_unsorted_overlap_is_detected_after_sorting() {
        let per_day = week_with(
            Weekday::Tue,
            vec![
                block(t(14, 0), t(16, 0), BlindMode::Dark),
                block(t(12, 0), t(15, 0), BlindMode::Light),
            ],
        );
        let err = Schedule::new(BlindMode::Eco, Some(per_day)).unwrap_err();
        assert!(matches!(
            err,
            BlindsError::SchedulingConflict { ref day, .. } if day == "tuesday"
        ));
    }

    #[test]
    fn test_missing_day_is_invalid_schedule() {
        let mut per_day = week_with(Weekday::Mon, Vec::new());
        per_day.remove(&Weekday::Wed);
        let err = Schedule::new(BlindMode::Dark, Some(per_day)).unwrap_err();
        assert_eq!(
            err,
            BlindsError::InvalidSchedule("missing day 'wednesday'".to_string())
        );
    }

    #[test]
    fn test_bad_default_is_invalid_schedule() {
        assert!(matches!(
            Schedule::from_parts("MANUAL", None, None),
            Err(BlindsError::InvalidSchedule(_))
        ));
        assert!(matches!(
            Schedule::from_parts("MANUAL", Some(-150), None),
            Err(BlindsError::InvalidSchedule(_))
        ));
        let schedule = Schedule::from_parts("MANUAL", Some(-50), None).unwrap();
        assert_eq!(schedule.default_position(), Some(-50));
    }

    #[test]
    fn test_replace_day_keeps_schedule_on_conflict() {
        let mut schedule = Schedule::default();
        schedule
            .replace_day(Weekday::Fri, vec![block(t(8, 0), t(9, 0), BlindMode::Light)])
            .unwrap();

        let result = schedule.replace_day(
            Weekday::Fri,
            vec![
                block(t(8, 0), t(10, 0), BlindMode::Light),
                block(t(9, 0), t(11, 0), BlindMode::Dark),
            ],
        );
        assert!(result.is_err());
        assert_eq!(schedule.blocks(Weekday::Fri).len(), 1);
    }

    #[test]
    fn test_clear_all_keeps_default() {
        let per_day = week_with(Weekday::Sat, vec![block(t(8, 0), t(9, 0), BlindMode::Light)]);
        let mut schedule = Schedule::from_parts("MANUAL", Some(10), Some(per_day)).unwrap();
        schedule.clear_all();
        assert!(schedule.is_empty());
        assert_eq!(schedule.default_position(), Some(10));
    }

    #[test]
    fn test_record_shape() {
        let per_day = week_with(Weekday::Sun, vec![block(t(7, 0), t(8, 30), BlindMode::Light)]);
        let schedule = Schedule::new(BlindMode::Dark, Some(per_day)).unwrap();
        let value = schedule.to_json();
        assert_eq!(value["default_mode"], json!("DARK"));
        assert_eq!(value["default_pos"], serde_json::Value::Null);
        assert_eq!(
            value["schedule"]["sunday"],
            json!([{"start": "07:00", "end": "08:30", "mode": "LIGHT", "position": null}])
        );
        assert_eq!(value["schedule"]["saturday"], json!([]));
        assert!(value.get("timezone").is_none());
    }

    #[test]
    fn test_from_json_accepts_legacy_default_key() {
        let schedule = Schedule::from_json(json!({
            "default": "GREEN",
            "default_pos": null,
            "schedule": {
                "sunday": [], "monday": [], "tuesday": [], "wednesday": [],
                "thursday": [], "friday": [], "saturday": []
            }
        }))
        .unwrap();
        assert_eq!(schedule.default_mode(), BlindMode::Eco);
    }

    #[test]
    fn test_from_json_rejects_unknown_day() {
        let err = Schedule::from_json(json!({
            "default_mode": "DARK",
            "default_pos": null,
            "schedule": {
                "sunday": [], "monday": [], "tuesday": [], "wednesday": [],
                "thursday": [], "friday": [], "saturday": [], "funday": []
            }
        }))
        .unwrap_err();
        assert!(matches!(err, BlindsError::InvalidSchedule(_)));
    }

    #[test]
    fn test_from_json_names_missing_day() {
        let err = Schedule::from_json(json!({
            "default_mode": "DARK",
            "schedule": {
                "sunday": [], "monday": [], "tuesday": [],
                "thursday": [], "friday": [], "saturday": []
            }
        }))
        .unwrap_err();
        match err {
            BlindsError::InvalidSchedule(message) => assert!(message.contains("wednesday")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_rejects_wrong_element_type() {
        let err = Schedule::from_json(json!({
            "default_mode": "DARK",
            "schedule": {
                "sunday": ["07:00-08:00"], "monday": [], "tuesday": [], "wednesday": [],
                "thursday": [], "friday": [], "saturday": []
            }
        }))
        .unwrap_err();
        assert!(matches!(err, BlindsError::InvalidSchedule(_)));
    }

    #[test]
    fn test_timezone_round_trip_and_localize() {
        let schedule = Schedule::from_json(json!({
            "default_mode": "DARK",
            "schedule": {
                "sunday": [], "monday": [], "tuesday": [], "wednesday": [],
                "thursday": [], "friday": [], "saturday": []
            },
            "timezone": "America/Edmonton"
        }))
        .unwrap();
        assert_eq!(schedule.timezone(), Some(chrono_tz::America::Edmonton));
        assert_eq!(schedule.to_json()["timezone"], json!("America/Edmonton"));

        // 2024-06-03 03:30 UTC is Sunday 21:30 in Edmonton (UTC-6 in summer).
        let instant = DateTime::parse_from_rfc3339("2024-06-03T03:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let (date, weekday, time) = schedule.localize(instant);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(weekday, Weekday::Sun);
        assert_eq!(time, t(21, 30));
    }

    #[test]
    fn test_unknown_timezone_is_invalid_schedule() {
        let err = Schedule::from_json(json!({
            "default_mode": "DARK",
            "schedule": {
                "sunday": [], "monday": [], "tuesday": [], "wednesday": [],
                "thursday": [], "friday": [], "saturday": []
            },
            "timezone": "Mars/Olympus"
        }))
        .unwrap_err();
        assert!(matches!(err, BlindsError::InvalidSchedule(_)));
    }

    #[test]
    fn test_block_at() {
        let per_day = week_with(Weekday::Thu, vec![block(t(9, 0), t(10, 0), BlindMode::Eco)]);
        let schedule = Schedule::new(BlindMode::Dark, Some(per_day)).unwrap();
        assert!(schedule.block_at(Weekday::Thu, t(9, 30)).is_some());
        assert!(schedule.block_at(Weekday::Thu, t(10, 0)).is_none());
        assert!(schedule.block_at(Weekday::Wed, t(9, 30)).is_none());
    }
}
