use std::collections::HashSet;

use assert_matches::assert_matches;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use schedule_cell::models::{
    DateOverride, LeaveInterval, ScheduleError, ScheduleLayers, WeeklyTemplate, WorkingDay,
};
use schedule_cell::services::{generate_slots, MAX_GENERATION_DAYS};
use shared_models::TimeRange;

// ==============================================================================
// FIXTURES
// ==============================================================================

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
    TimeRange { start: t(sh, sm), end: t(eh, em) }
}

fn monday() -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
    assert_eq!(date.weekday(), Weekday::Mon);
    date
}

fn layers_with(template: WeeklyTemplate) -> ScheduleLayers {
    let mut layers = ScheduleLayers::empty(Uuid::new_v4());
    layers.template = Some(template);
    layers
}

fn monday_morning(duration: i32) -> ScheduleLayers {
    layers_with(WeeklyTemplate {
        slot_duration_minutes: duration,
        days: vec![WorkingDay {
            weekday: Weekday::Mon,
            windows: vec![range(9, 0, 12, 0)],
        }],
    })
}

fn full_week() -> ScheduleLayers {
    layers_with(WeeklyTemplate {
        slot_duration_minutes: 20,
        days: vec![
            WorkingDay { weekday: Weekday::Mon, windows: vec![range(9, 0, 12, 0), range(13, 0, 17, 10)] },
            WorkingDay { weekday: Weekday::Tue, windows: vec![range(8, 0, 11, 0), range(10, 0, 12, 30)] },
            WorkingDay { weekday: Weekday::Wed, windows: vec![range(9, 0, 9, 45)] },
            WorkingDay { weekday: Weekday::Thu, windows: vec![range(14, 0, 18, 0)] },
            WorkingDay { weekday: Weekday::Fri, windows: vec![range(9, 0, 12, 0)] },
            WorkingDay { weekday: Weekday::Fri, windows: vec![range(11, 0, 13, 0)] },
        ],
    })
}

// ==============================================================================
// CONCRETE SCENARIOS
// ==============================================================================

#[test]
fn monday_morning_yields_six_half_hour_slots() {
    let layers = monday_morning(30);

    let slots = generate_slots(&layers, monday(), 1).unwrap();

    let starts: Vec<_> = slots.iter().map(|s| s.time_range.start).collect();
    assert_eq!(
        starts,
        vec![t(9, 0), t(9, 30), t(10, 0), t(10, 30), t(11, 0), t(11, 30)]
    );
    assert_eq!(slots.last().unwrap().time_range.end, t(12, 0));
}

#[test]
fn trailing_fragment_is_discarded() {
    let layers = layers_with(WeeklyTemplate {
        slot_duration_minutes: 30,
        days: vec![WorkingDay { weekday: Weekday::Mon, windows: vec![range(9, 0, 12, 15)] }],
    });

    let slots = generate_slots(&layers, monday(), 1).unwrap();

    assert_eq!(slots.len(), 6);
    assert!(slots.iter().all(|s| s.time_range.end <= t(12, 0)));
}

#[test]
fn leave_removes_every_slot_without_override() {
    let mut layers = monday_morning(30);
    layers.leave.push(LeaveInterval {
        id: Uuid::new_v4(),
        start_date: monday(),
        end_date: monday(),
        reason: Some("conference".to_string()),
    });

    let slots = generate_slots(&layers, monday(), 1).unwrap();

    assert!(slots.is_empty());
}

#[test]
fn leave_beats_an_override_on_the_same_date() {
    let mut layers = monday_morning(30);
    layers.overrides.insert(monday(), DateOverride {
        date: monday(),
        windows: vec![range(14, 0, 16, 0)],
        slot_duration_minutes: None,
        reason: None,
    });
    layers.leave.push(LeaveInterval {
        id: Uuid::new_v4(),
        start_date: monday().pred_opt().unwrap(),
        end_date: monday().succ_opt().unwrap(),
        reason: None,
    });

    assert!(generate_slots(&layers, monday(), 1).unwrap().is_empty());
}

#[test]
fn override_replaces_template_for_its_date_only() {
    let mut layers = monday_morning(30);
    let next_monday = monday() + chrono::Duration::days(7);
    layers.overrides.insert(monday(), DateOverride {
        date: monday(),
        windows: vec![range(14, 0, 15, 0)],
        slot_duration_minutes: Some(20),
        reason: Some("afternoon clinic".to_string()),
    });

    let slots = generate_slots(&layers, monday(), 8).unwrap();

    let overridden: Vec<_> = slots.iter().filter(|s| s.date == monday()).collect();
    assert_eq!(overridden.len(), 3);
    assert!(overridden.iter().all(|s| s.time_range.duration_minutes() == 20));
    assert_eq!(overridden[0].time_range.start, t(14, 0));

    let regular: Vec<_> = slots.iter().filter(|s| s.date == next_monday).collect();
    assert_eq!(regular.len(), 6);
}

#[test]
fn empty_override_closes_the_date() {
    let mut layers = monday_morning(30);
    layers.overrides.insert(monday(), DateOverride {
        date: monday(),
        windows: vec![],
        slot_duration_minutes: None,
        reason: Some("public holiday".to_string()),
    });

    assert!(generate_slots(&layers, monday(), 1).unwrap().is_empty());
}

#[test]
fn slot_ids_follow_provider_date_and_start() {
    let layers = monday_morning(30);

    let slots = generate_slots(&layers, monday(), 1).unwrap();

    assert_eq!(slots[0].id, format!("{}:2025-06-16:0900", layers.provider_id));
    assert_eq!(slots[5].id, format!("{}:2025-06-16:1130", layers.provider_id));
}

#[test]
fn provider_without_template_has_no_slots() {
    let layers = ScheduleLayers::empty(Uuid::new_v4());

    assert!(generate_slots(&layers, monday(), 14).unwrap().is_empty());
}

// ==============================================================================
// VALIDATION
// ==============================================================================

#[test]
fn non_positive_duration_is_rejected() {
    assert_matches!(generate_slots(&monday_morning(0), monday(), 1), Err(ScheduleError::Validation(_)));
    assert_matches!(generate_slots(&monday_morning(-15), monday(), 1), Err(ScheduleError::Validation(_)));
}

#[test]
fn inverted_window_is_rejected_even_outside_requested_dates() {
    let layers = layers_with(WeeklyTemplate {
        slot_duration_minutes: 30,
        days: vec![
            WorkingDay { weekday: Weekday::Mon, windows: vec![range(9, 0, 12, 0)] },
            WorkingDay { weekday: Weekday::Sat, windows: vec![range(12, 0, 9, 0)] },
        ],
    });

    assert_matches!(generate_slots(&layers, monday(), 1), Err(ScheduleError::Validation(_)));
}

#[test]
fn zero_length_override_window_is_rejected() {
    let mut layers = monday_morning(30);
    layers.overrides.insert(monday(), DateOverride {
        date: monday(),
        windows: vec![range(10, 0, 10, 0)],
        slot_duration_minutes: None,
        reason: None,
    });

    assert_matches!(generate_slots(&layers, monday(), 1), Err(ScheduleError::Validation(_)));
}

#[test]
fn override_without_any_duration_is_rejected() {
    let mut layers = ScheduleLayers::empty(Uuid::new_v4());
    layers.overrides.insert(monday(), DateOverride {
        date: monday(),
        windows: vec![range(9, 0, 10, 0)],
        slot_duration_minutes: None,
        reason: None,
    });

    assert_matches!(generate_slots(&layers, monday(), 1), Err(ScheduleError::Validation(_)));
}

// ==============================================================================
// PROPERTIES
// ==============================================================================

#[test]
fn generated_keys_are_unique_over_a_month() {
    let layers = full_week();

    let slots = generate_slots(&layers, monday(), 31).unwrap();

    let keys: HashSet<_> = slots
        .iter()
        .map(|s| (s.provider_id, s.date, s.time_range))
        .collect();
    assert_eq!(keys.len(), slots.len());

    let ids: HashSet<_> = slots.iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids.len(), slots.len());
}

#[test]
fn every_slot_has_configured_duration_and_sits_in_a_window() {
    let layers = full_week();
    let template = layers.template.clone().unwrap();

    let slots = generate_slots(&layers, monday(), 31).unwrap();

    assert!(!slots.is_empty());
    for slot in &slots {
        assert_eq!(slot.time_range.duration_minutes(), 20);
        let windows = template.windows_for(slot.date.weekday());
        assert!(
            windows.iter().any(|w| w.contains(&slot.time_range)),
            "slot {} outside declared windows",
            slot.id
        );
    }
}

#[test]
fn output_is_ordered_by_date_then_start() {
    let slots = generate_slots(&full_week(), monday(), 31).unwrap();

    for pair in slots.windows(2) {
        assert!((pair[0].date, pair[0].time_range.start) < (pair[1].date, pair[1].time_range.start));
    }
}

#[test]
fn overlapping_windows_do_not_produce_overlapping_slots() {
    let layers = full_week();
    let tuesday = monday().succ_opt().unwrap();

    let slots = generate_slots(&layers, tuesday, 1).unwrap();

    // 08:00-12:30 after merging: 13 whole 20-minute slots
    assert_eq!(slots.len(), 13);
    for pair in slots.windows(2) {
        assert!(!pair[0].time_range.overlaps(&pair[1].time_range));
    }
}

#[test]
fn window_past_the_calendar_is_rejected() {
    let start = NaiveDate::MAX.pred_opt().unwrap();

    let result = generate_slots(&full_week(), start, 5);

    assert_matches!(result, Err(ScheduleError::Validation(_)));
}

#[test]
fn window_longer_than_a_year_is_rejected() {
    let result = generate_slots(&full_week(), monday(), MAX_GENERATION_DAYS + 1);

    assert_matches!(result, Err(ScheduleError::Validation(_)));
}

#[test]
fn window_ending_on_the_last_date_is_accepted() {
    let start = NaiveDate::MAX.pred_opt().unwrap();

    assert!(generate_slots(&full_week(), start, 1).is_ok());
}
