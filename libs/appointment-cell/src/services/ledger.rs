// libs/appointment-cell/src/services/ledger.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::models::{Appointment, AppointmentGuard};

/// Persisted appointment records.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<(), StoreError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Replaces the record with `updated` only while it still matches
    /// `expected`. `None` means someone else changed it first.
    async fn update_if(
        &self,
        updated: &Appointment,
        expected: &AppointmentGuard,
    ) -> Result<Option<Appointment>, StoreError>;

    /// Appointments of one provider with `from <= date < until`, ordered by
    /// date and start time.
    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryAppointmentLedger {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentLedger for InMemoryAppointmentLedger {
    async fn insert(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let mut appointments = self.appointments.write().await;
        if appointments.contains_key(&appointment.id) {
            return Err(StoreError::Api {
                status: 409,
                message: format!("appointment {} already exists", appointment.id),
            });
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&appointment_id).cloned())
    }

    async fn update_if(
        &self,
        updated: &Appointment,
        expected: &AppointmentGuard,
    ) -> Result<Option<Appointment>, StoreError> {
        let mut appointments = self.appointments.write().await;
        match appointments.get_mut(&updated.id) {
            Some(current) if expected.matches(current) => {
                *current = updated.clone();
                Ok(Some(current.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let appointments = self.appointments.read().await;
        let mut matching: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.provider_id == provider_id && a.date >= from && a.date < until)
            .cloned()
            .collect();
        matching.sort_by_key(|a| (a.date, a.start_time, a.created_at));
        Ok(matching)
    }
}

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// `appointments` table through PostgREST; `update_if` is a PATCH filtered on
/// the guard columns.
pub struct SupabaseAppointmentLedger {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentLedger {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AppointmentLedger for SupabaseAppointmentLedger {
    async fn insert(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            APPOINTMENTS_PATH,
            Some(serde_json::to_value(appointment)?),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if rows.is_empty() {
            return Err(StoreError::Api {
                status: 500,
                message: format!("insert of appointment {} returned no row", appointment.id),
            });
        }
        Ok(())
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS_PATH, appointment_id);
        let rows: Vec<Appointment> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_if(
        &self,
        updated: &Appointment,
        expected: &AppointmentGuard,
    ) -> Result<Option<Appointment>, StoreError> {
        let path = format!(
            "{}?id=eq.{}&status=eq.{}&slot_id=eq.{}",
            APPOINTMENTS_PATH, updated.id, expected.status, expected.slot_id
        );
        let body = json!({
            "slot_id": updated.slot_id,
            "date": updated.date,
            "start_time": updated.start_time,
            "end_time": updated.end_time,
            "status": updated.status,
            "last_modified_by": updated.last_modified_by,
            "cancellation_reason": updated.cancellation_reason,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;
        debug!("Guarded update of appointment {} matched {} rows", updated.id, rows.len());
        Ok(rows.into_iter().next())
    }

    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?provider_id=eq.{}&date=gte.{}&date=lt.{}&order=date.asc,start_time.asc",
            APPOINTMENTS_PATH, provider_id, from, until
        );
        self.supabase.request(Method::GET, &path, None).await
    }
}
