#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use appointment_cell::models::{Appointment, CreateAppointmentRequest};
use appointment_cell::services::{
    AppointmentLedger, BookingCoordinator, InMemoryAppointmentLedger, Notification,
    NotificationDispatcher, NotificationError, Reconciler,
};
use patient_cell::models::Patient;
use patient_cell::services::InMemoryPatientDirectory;
use schedule_cell::models::{WeeklyTemplate, WorkingDay};
use schedule_cell::services::{InMemoryScheduleStore, ScheduleService};
use shared_config::BookingPolicy;
use shared_models::TimeRange;
use slot_cell::models::{slot_id, Slot};
use slot_cell::services::{InMemorySlotStore, SlotRegistry, SlotStore};

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn range(sh: u32, sm: u32, eh: u32, em: u32) -> TimeRange {
    TimeRange::new(t(sh, sm), t(eh, em)).unwrap()
}

/// 2025-06-16, a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
}

/// Records every dispatched notification.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn events(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.template_data["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn dispatch(&self, _notification: &Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected(502))
    }
}

pub struct TestSetup {
    pub provider_id: Uuid,
    pub patient: Patient,
    pub slots: Arc<InMemorySlotStore>,
    pub ledger: Arc<InMemoryAppointmentLedger>,
    pub patients: Arc<InMemoryPatientDirectory>,
    pub notifications: Arc<RecordingDispatcher>,
    pub coordinator: Arc<BookingCoordinator>,
    pub reconciler: Arc<Reconciler>,
}

impl TestSetup {
    pub async fn new() -> Self {
        Self::with_policy(BookingPolicy::default()).await
    }

    /// Provider working Mondays 09:00-12:00 in 30-minute slots, materialised
    /// for the week of [`monday`], plus one registered patient.
    pub async fn with_policy(policy: BookingPolicy) -> Self {
        let provider_id = Uuid::new_v4();
        let slots = Arc::new(InMemorySlotStore::new());
        let schedule_store = Arc::new(InMemoryScheduleStore::new());
        let schedules = ScheduleService::new(schedule_store.clone());
        schedules
            .set_weekly_template(provider_id, WeeklyTemplate {
                slot_duration_minutes: 30,
                days: vec![WorkingDay {
                    weekday: Weekday::Mon,
                    windows: vec![range(9, 0, 12, 0)],
                }],
            })
            .await
            .unwrap();
        SlotRegistry::new(slots.clone(), schedule_store, 28)
            .regenerate_range(provider_id, monday(), 7)
            .await
            .unwrap();

        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: "Niamh".to_string(),
            last_name: "Kelly".to_string(),
            email: Some("niamh@example.com".to_string()),
            phone_number: None,
        };
        let patients = Arc::new(InMemoryPatientDirectory::new());
        patients.insert(patient.clone()).await;

        let ledger = Arc::new(InMemoryAppointmentLedger::new());
        let notifications = Arc::new(RecordingDispatcher::default());
        // Claims made by the tests themselves are never in flight.
        let settled = BookingPolicy {
            reconcile_grace_seconds: 0,
            ..policy.clone()
        };
        let reconciler = Arc::new(Reconciler::new(slots.clone(), ledger.clone(), &settled));
        let coordinator = Arc::new(BookingCoordinator::new(
            slots.clone(),
            ledger.clone(),
            patients.clone(),
            notifications.clone(),
            policy,
        ));

        Self {
            provider_id,
            patient,
            slots,
            ledger,
            patients,
            notifications,
            coordinator,
            reconciler,
        }
    }

    pub fn request(&self, time_range: TimeRange) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            provider_id: self.provider_id,
            patient_id: self.patient.id,
            date: monday(),
            time_range,
            modified_by: "front-desk".to_string(),
            notes: None,
        }
    }

    pub async fn book(&self, time_range: TimeRange) -> Appointment {
        self.coordinator.create(self.request(time_range)).await.unwrap()
    }

    pub async fn slot_at(&self, start: NaiveTime) -> Slot {
        self.slots
            .get(&slot_id(self.provider_id, monday(), start))
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn stored(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.ledger.get(appointment_id).await.unwrap()
    }
}
