// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::TimeRange;

// ==============================================================================
// APPOINTMENT STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Arrived,
    Completed,
    NoShow,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    /// Statuses that hand the slot back to the pool.
    pub fn releases_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Arrived => write!(f, "arrived"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// APPOINTMENT RECORD
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub slot_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub last_modified_by: String,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }

    /// Guard matching this appointment exactly as it was read.
    pub fn guard(&self) -> AppointmentGuard {
        AppointmentGuard {
            status: self.status,
            slot_id: self.slot_id.clone(),
        }
    }
}

/// Previously observed state an appointment write is conditional on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentGuard {
    pub status: AppointmentStatus,
    pub slot_id: String,
}

impl AppointmentGuard {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        appointment.status == self.status && appointment.slot_id == self.slot_id
    }
}

// ==============================================================================
// REQUEST TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub provider_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time_range: TimeRange,
    pub modified_by: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: NaiveDate,
    pub time_range: TimeRange,
    pub modified_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: Option<String>,
    pub modified_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
    pub modified_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockSlotRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub provider_id: Uuid,
    pub from: NaiveDate,
    /// Inclusive.
    pub to: NaiveDate,
}

// ==============================================================================
// RECONCILIATION
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub checked_slots: usize,
    pub healthy: usize,
    /// Booked slots handed back because no live appointment owns them.
    pub released: Vec<String>,
    /// Orphans that changed before the release landed.
    pub skipped: usize,
    /// Booked slots claimed within the grace period, left for a later pass.
    pub deferred: usize,
    /// Live appointments whose slot is not booked by them.
    pub unbacked_appointments: Vec<Uuid>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot {slot_id} is not available")]
    SlotUnavailable { slot_id: String },

    #[error("Patient {patient_id} is not registered")]
    RegistrationRequired { patient_id: Uuid },

    #[error("Cannot {action} an appointment that is {from}")]
    InvalidTransition {
        from: AppointmentStatus,
        action: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl BookingError {
    pub(crate) fn slot_unavailable(slot_id: &str) -> Self {
        BookingError::SlotUnavailable {
            slot_id: slot_id.to_string(),
        }
    }
}
