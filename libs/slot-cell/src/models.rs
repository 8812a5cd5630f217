use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use schedule_cell::models::{ScheduleError, SlotDescriptor};
use shared_database::StoreError;
use shared_models::TimeRange;

pub use schedule_cell::models::slot_id;

// ==============================================================================
// SLOT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Blocked,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Booked => write!(f, "booked"),
            SlotStatus::Blocked => write!(f, "blocked"),
        }
    }
}

/// Persisted slot. `appointment_id` is a back-reference only; the appointment
/// owns the slot, never the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: SlotStatus,
    pub appointment_id: Option<Uuid>,
    pub block_reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    pub fn available(descriptor: &SlotDescriptor) -> Self {
        Self {
            id: descriptor.id.clone(),
            provider_id: descriptor.provider_id,
            date: descriptor.date,
            start_time: descriptor.time_range.start,
            end_time: descriptor.time_range.end,
            status: SlotStatus::Available,
            appointment_id: None,
            block_reason: None,
            updated_at: Utc::now(),
        }
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_booked(&self) -> bool {
        self.status == SlotStatus::Booked
    }

    /// The guard that matches this slot exactly as it was read.
    pub fn guard(&self) -> SlotGuard {
        SlotGuard {
            status: self.status,
            appointment_id: self.appointment_id,
        }
    }

    pub fn view(&self) -> SlotView {
        SlotView {
            id: self.id.clone(),
            time_range: self.time_range(),
            status: self.status,
        }
    }
}

/// Public shape of a slot in availability queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub id: String,
    pub time_range: TimeRange,
    pub status: SlotStatus,
}

// ==============================================================================
// CONDITIONAL UPDATES
// ==============================================================================

/// Expected state of a slot for a conditional write to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGuard {
    pub status: SlotStatus,
    pub appointment_id: Option<Uuid>,
}

impl SlotGuard {
    pub fn available() -> Self {
        Self { status: SlotStatus::Available, appointment_id: None }
    }

    pub fn blocked() -> Self {
        Self { status: SlotStatus::Blocked, appointment_id: None }
    }

    pub fn booked_by(appointment_id: Uuid) -> Self {
        Self { status: SlotStatus::Booked, appointment_id: Some(appointment_id) }
    }

    pub fn matches(&self, slot: &Slot) -> bool {
        slot.status == self.status && slot.appointment_id == self.appointment_id
    }
}

/// New ownership fields written when a guard matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotUpdate {
    pub status: SlotStatus,
    pub appointment_id: Option<Uuid>,
    pub block_reason: Option<String>,
}

impl SlotUpdate {
    pub fn book(appointment_id: Uuid) -> Self {
        Self { status: SlotStatus::Booked, appointment_id: Some(appointment_id), block_reason: None }
    }

    pub fn release() -> Self {
        Self { status: SlotStatus::Available, appointment_id: None, block_reason: None }
    }

    pub fn block(reason: Option<String>) -> Self {
        Self { status: SlotStatus::Blocked, appointment_id: None, block_reason: reason }
    }

    pub fn apply_to(&self, slot: &mut Slot) {
        slot.status = self.status;
        slot.appointment_id = self.appointment_id;
        slot.block_reason = self.block_reason.clone();
        slot.updated_at = Utc::now();
    }
}

// ==============================================================================
// REGENERATION
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationReport {
    pub created: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub kept_booked: usize,
    /// Slots that changed between the scan and their delete and were left alone.
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegenerateRequest {
    pub start_date: Option<NaiveDate>,
    pub days: Option<u32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum SlotError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}
