use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};
use tiltr::error::BlindsError;
use tiltr::motor::{AngleStepMapper, MicrostepResolution, StepDirection};
use tiltr::schedule::{
    BlindMode, BlockPosition, Command, Schedule, TimeBlock, WEEK, end_of_day, has_conflict,
};
use tiltr::state::angle::MemoryAngleStore;

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn block(start: NaiveTime, end: NaiveTime, mode: BlindMode) -> TimeBlock {
    TimeBlock::new(start, end, mode).unwrap()
}

fn week_with(day: Weekday, blocks: Vec<TimeBlock>) -> HashMap<Weekday, Vec<TimeBlock>> {
    let mut week: HashMap<Weekday, Vec<TimeBlock>> =
        WEEK.iter().map(|&d| (d, Vec::new())).collect();
    week.insert(day, blocks);
    week
}

#[test]
fn test_overlapping_blocks_conflict() {
    let blocks = vec![
        block(t(12, 0), t(15, 0), BlindMode::Light),
        block(t(14, 0), t(16, 0), BlindMode::Dark),
    ];
    assert!(has_conflict(&blocks));

    let err = Schedule::new(BlindMode::Dark, Some(week_with(Weekday::Mon, blocks))).unwrap_err();
    assert!(matches!(err, BlindsError::SchedulingConflict { .. }));
}

#[test]
fn test_back_to_back_blocks_are_allowed() {
    let blocks = vec![
        block(t(22, 0), t(23, 0), BlindMode::Light),
        block(t(23, 0), t(23, 30), BlindMode::Dark),
    ];
    assert!(!has_conflict(&blocks));

    let schedule = Schedule::new(BlindMode::Eco, Some(week_with(Weekday::Fri, blocks))).unwrap();
    assert_eq!(
        schedule.block_at(Weekday::Fri, t(23, 0)).map(TimeBlock::mode),
        Some(BlindMode::Dark)
    );
    assert_eq!(
        schedule.block_at(Weekday::Fri, t(22, 59)).map(TimeBlock::mode),
        Some(BlindMode::Light)
    );
}

#[test]
fn test_schedule_sorts_blocks_before_checking() {
    let unsorted = vec![
        block(t(18, 0), t(20, 0), BlindMode::Dark),
        block(t(8, 0), t(9, 0), BlindMode::Light),
    ];
    let schedule =
        Schedule::new(BlindMode::Dark, Some(week_with(Weekday::Tue, unsorted))).unwrap();
    let starts: Vec<NaiveTime> = schedule
        .blocks(Weekday::Tue)
        .iter()
        .map(TimeBlock::start)
        .collect();
    assert_eq!(starts, vec![t(8, 0), t(18, 0)]);
}

#[test]
fn test_manual_command_projects_from_now() {
    let command = Command::from_parts("MANUAL", 120, Some(70)).unwrap();
    let projected = command.to_time_block(|| t(16, 31)).unwrap();

    assert_eq!(projected.start(), t(16, 31));
    assert_eq!(projected.end(), t(18, 31));
    assert_eq!(projected.mode(), BlindMode::manual(70).unwrap());
    assert_eq!(projected.position(), Some(70));
}

#[test]
fn test_command_edge_cases() {
    let zero = Command::from_parts("DARK", 0, None).unwrap();
    assert_eq!(zero.to_time_block(|| t(9, 15)).unwrap().end(), end_of_day());

    let long = Command::from_parts("ECO", 600, None).unwrap();
    assert_eq!(long.to_time_block(|| t(20, 0)).unwrap().end(), end_of_day());

    let any = Command::from_parts("LIGHT", 5, None).unwrap();
    assert!(any.to_time_block(|| t(23, 59)).is_none());

    // Seconds are dropped before projecting.
    let seconds = NaiveTime::from_hms_opt(10, 0, 42).unwrap();
    assert_eq!(any.to_time_block(|| seconds).unwrap().start(), t(10, 0));
}

#[test]
fn test_manual_position_is_validated_everywhere() {
    assert!(Command::from_parts("MANUAL", 10, Some(101)).is_err());
    assert!(Command::from_parts("MANUAL", 10, None).is_err());
    assert!(TimeBlock::from_parts(t(8, 0), t(9, 0), "MANUAL", Some(-101)).is_err());
    assert!(Schedule::from_parts("MANUAL", Some(150), None).is_err());
    assert!(Schedule::from_parts("manual", Some(-100), None).is_ok());
}

#[test]
fn test_block_classification_is_half_open() {
    let morning = block(t(8, 0), t(10, 0), BlindMode::Light);
    assert_eq!(morning.classify(t(7, 59)), BlockPosition::Before);
    assert_eq!(morning.classify(t(8, 0)), BlockPosition::Within);
    assert_eq!(morning.classify(t(9, 59)), BlockPosition::Within);
    assert_eq!(morning.classify(t(10, 0)), BlockPosition::After);
}

#[test]
fn test_mapper_round_trip_in_full_steps() {
    let store = MemoryAngleStore::new(0.0);
    let mut mapper = AngleStepMapper::new(Box::new(store.clone()), 1.0);

    let open = mapper
        .map_angle_to_step(45.0, MicrostepResolution::Full)
        .unwrap();
    assert_eq!((open.steps, open.direction), (25, StepDirection::Forward));

    let close = mapper
        .map_angle_to_step(0.0, MicrostepResolution::Full)
        .unwrap();
    assert_eq!((close.steps, close.direction), (25, StepDirection::Reverse));
    assert_eq!(store.angle(), 0.0);
}

#[test]
fn test_schedule_json_round_trip() {
    let blocks = vec![
        block(t(7, 0), t(9, 30), BlindMode::Balanced),
        block(t(21, 0), t(23, 59), BlindMode::manual(-40).unwrap()),
    ];
    let schedule = Schedule::new(BlindMode::Eco, Some(week_with(Weekday::Sun, blocks)))
        .unwrap()
        .with_timezone(Some(chrono_tz::Europe::Berlin));

    let json = schedule.to_json();
    assert_eq!(json["default_mode"], "ECO");
    assert_eq!(json["schedule"]["sunday"][1]["position"], -40);
    assert_eq!(Schedule::from_json(json).unwrap(), schedule);
}

#[test]
fn test_legacy_green_mode_name() {
    let schedule = Schedule::from_json_str(
        r#"{
            "default": "GREEN",
            "schedule": {
                "sunday": [], "monday": [], "tuesday": [], "wednesday": [],
                "thursday": [], "friday": [], "saturday": []
            }
        }"#,
    )
    .unwrap();
    assert_eq!(schedule.default_mode(), BlindMode::Eco);
}
