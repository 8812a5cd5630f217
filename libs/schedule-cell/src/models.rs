use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::TimeRange;

// ==============================================================================
// SCHEDULE LAYERS
// ==============================================================================

/// Working windows for one weekday. A template may list the same weekday more
/// than once; the windows are combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub weekday: Weekday,
    pub windows: Vec<TimeRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTemplate {
    pub slot_duration_minutes: i32,
    pub days: Vec<WorkingDay>,
}

impl WeeklyTemplate {
    pub fn windows_for(&self, weekday: Weekday) -> Vec<TimeRange> {
        self.days
            .iter()
            .filter(|day| day.weekday == weekday)
            .flat_map(|day| day.windows.iter().copied())
            .collect()
    }
}

/// Replaces the weekly template for a single date. No windows closes the date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateOverride {
    pub date: NaiveDate,
    pub windows: Vec<TimeRange>,
    /// Falls back to the template's duration when absent.
    pub slot_duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

/// Inclusive date range during which the provider takes no bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveInterval {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

impl LeaveInterval {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Complete schedule document for one provider. Edits never mutate a stored
/// document; they produce a new one with `version` bumped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleLayers {
    pub provider_id: Uuid,
    pub template: Option<WeeklyTemplate>,
    #[serde(default)]
    pub overrides: BTreeMap<NaiveDate, DateOverride>,
    #[serde(default)]
    pub leave: Vec<LeaveInterval>,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleLayers {
    pub fn empty(provider_id: Uuid) -> Self {
        Self {
            provider_id,
            template: None,
            overrides: BTreeMap::new(),
            leave: Vec::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn is_on_leave(&self, date: NaiveDate) -> bool {
        self.leave.iter().any(|interval| interval.covers(date))
    }
}

// ==============================================================================
// GENERATED SLOTS
// ==============================================================================

/// A slot that the current schedule says should exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDescriptor {
    pub id: String,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub time_range: TimeRange,
}

/// Deterministic slot identifier: `{provider}:{YYYY-MM-DD}:{HHMM}`.
pub fn slot_id(provider_id: Uuid, date: NaiveDate, start: NaiveTime) -> String {
    format!("{}:{}:{}", provider_id, date.format("%Y-%m-%d"), start.format("%H%M"))
}

// ==============================================================================
// EVENTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleChangeKind {
    WeeklyTemplate,
    DateOverride,
    Leave,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleChanged {
    pub provider_id: Uuid,
    pub kind: ScheduleChangeKind,
    pub version: u64,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDateOverrideRequest {
    pub windows: Vec<TimeRange>,
    pub slot_duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeaveRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Concurrent schedule edit: {0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
