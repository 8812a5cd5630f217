use chrono::{Datelike, Days, Duration, NaiveDate};
use tracing::debug;

use shared_models::TimeRange;

use crate::models::{slot_id, ScheduleError, ScheduleLayers, SlotDescriptor};

/// Longest span one generation pass may cover.
pub const MAX_GENERATION_DAYS: u32 = 366;

/// The first date after `[start, start + days)`.
pub fn window_end(start: NaiveDate, days: u32) -> Result<NaiveDate, ScheduleError> {
    if days > MAX_GENERATION_DAYS {
        return Err(ScheduleError::Validation(format!(
            "cannot generate {} days at once (at most {})",
            days, MAX_GENERATION_DAYS
        )));
    }
    start
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| {
            ScheduleError::Validation(format!(
                "{} days from {} runs past the supported calendar",
                days, start
            ))
        })
}

/// Compute the slots a provider's schedule implies for `[start, start + days)`.
///
/// Leave wins over everything, a date override replaces the weekly template
/// for its date, and each window is cut into left-aligned slots of the
/// configured duration. A trailing piece shorter than one slot is dropped.
/// The result is ordered by date, then start time.
pub fn generate_slots(
    layers: &ScheduleLayers,
    start: NaiveDate,
    days: u32,
) -> Result<Vec<SlotDescriptor>, ScheduleError> {
    let end = window_end(start, days)?;
    validate_layers(layers)?;

    let mut slots = Vec::new();

    for date in start.iter_days().take_while(|date| *date < end) {
        if layers.is_on_leave(date) {
            debug!("Provider {} on leave {}, no slots", layers.provider_id, date);
            continue;
        }

        let (windows, duration_minutes) = match layers.overrides.get(&date) {
            Some(date_override) => {
                let duration = date_override
                    .slot_duration_minutes
                    .or_else(|| layers.template.as_ref().map(|t| t.slot_duration_minutes));
                (date_override.windows.clone(), duration)
            }
            None => match &layers.template {
                Some(template) => (
                    template.windows_for(date.weekday()),
                    Some(template.slot_duration_minutes),
                ),
                None => (Vec::new(), None),
            },
        };

        if windows.is_empty() {
            continue;
        }

        let duration_minutes = duration_minutes.ok_or_else(|| {
            ScheduleError::Validation(format!(
                "no slot duration configured for provider {} on {}",
                layers.provider_id, date
            ))
        })?;
        let step = Duration::minutes(duration_minutes as i64);

        for window in merge_windows(windows) {
            let mut cursor = window.start;
            loop {
                // overflowing_add_signed reports a wrap past midnight as a
                // non-zero day delta.
                let (slot_end, wrapped) = cursor.overflowing_add_signed(step);
                if wrapped != 0 || slot_end > window.end {
                    break;
                }

                slots.push(SlotDescriptor {
                    id: slot_id(layers.provider_id, date, cursor),
                    provider_id: layers.provider_id,
                    date,
                    time_range: TimeRange { start: cursor, end: slot_end },
                });
                cursor = slot_end;
            }
        }
    }

    Ok(slots)
}

/// Reject schedules the generator cannot interpret, regardless of whether
/// the offending layer falls inside the requested window.
pub fn validate_layers(layers: &ScheduleLayers) -> Result<(), ScheduleError> {
    if let Some(template) = &layers.template {
        validate_duration(template.slot_duration_minutes)?;
        for day in &template.days {
            validate_windows(&day.windows)?;
        }
    }

    for date_override in layers.overrides.values() {
        if let Some(duration) = date_override.slot_duration_minutes {
            validate_duration(duration)?;
        }
        validate_windows(&date_override.windows)?;
    }

    for interval in &layers.leave {
        if interval.end_date < interval.start_date {
            return Err(ScheduleError::Validation(format!(
                "leave {} ends ({}) before it starts ({})",
                interval.id, interval.end_date, interval.start_date
            )));
        }
    }

    Ok(())
}

pub fn validate_duration(minutes: i32) -> Result<(), ScheduleError> {
    if minutes <= 0 {
        return Err(ScheduleError::Validation(format!(
            "slot duration must be positive, got {} minutes",
            minutes
        )));
    }
    Ok(())
}

pub fn validate_windows(windows: &[TimeRange]) -> Result<(), ScheduleError> {
    for window in windows {
        window
            .validate()
            .map_err(|e| ScheduleError::Validation(e.to_string()))?;
    }
    Ok(())
}

/// Sort windows and fold overlapping ones together. Windows that merely touch
/// stay separate so each keeps its own slot alignment.
pub fn merge_windows(mut windows: Vec<TimeRange>) -> Vec<TimeRange> {
    windows.sort();

    let mut merged: Vec<TimeRange> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if last.overlaps(&window) => {
                if window.end > last.end {
                    last.end = window.end;
                }
            }
            _ => merged.push(window),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
        TimeRange {
            start: NaiveTime::from_hms_opt(sh, sm, 0).unwrap(),
            end: NaiveTime::from_hms_opt(eh, em, 0).unwrap(),
        }
    }

    #[test]
    fn merges_overlapping_and_duplicate_windows() {
        let merged = merge_windows(vec![
            range(10, 0, 12, 0),
            range(9, 0, 10, 30),
            range(9, 0, 10, 30),
            range(14, 0, 15, 0),
        ]);
        assert_eq!(merged, vec![range(9, 0, 12, 0), range(14, 0, 15, 0)]);
    }

    #[test]
    fn keeps_touching_windows_apart() {
        let merged = merge_windows(vec![range(10, 15, 11, 0), range(9, 0, 10, 15)]);
        assert_eq!(merged, vec![range(9, 0, 10, 15), range(10, 15, 11, 0)]);
    }

    #[test]
    fn contained_window_is_absorbed() {
        let merged = merge_windows(vec![range(9, 0, 17, 0), range(11, 0, 12, 0)]);
        assert_eq!(merged, vec![range(9, 0, 17, 0)]);
    }
}
