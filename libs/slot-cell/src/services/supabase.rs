use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::models::{Slot, SlotGuard, SlotUpdate};
use crate::services::store::SlotStore;

const SLOTS_PATH: &str = "/rest/v1/slots";

/// `slots` table accessed through PostgREST. Guards become row filters, so
/// the database evaluates the condition and the write in one statement.
pub struct SupabaseSlotStore {
    supabase: SupabaseClient,
}

impl SupabaseSlotStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    fn guarded_path(slot_id: &str, guard: &SlotGuard) -> String {
        let appointment_filter = match guard.appointment_id {
            Some(appointment_id) => format!("eq.{}", appointment_id),
            None => "is.null".to_string(),
        };
        format!(
            "{}?id=eq.{}&status=eq.{}&appointment_id={}",
            SLOTS_PATH, slot_id, guard.status, appointment_filter
        )
    }
}

#[async_trait]
impl SlotStore for SupabaseSlotStore {
    async fn get(&self, slot_id: &str) -> Result<Option<Slot>, StoreError> {
        let path = format!("{}?id=eq.{}", SLOTS_PATH, slot_id);
        let rows: Vec<Slot> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let path = format!(
            "{}?provider_id=eq.{}&date=gte.{}&date=lt.{}&order=date.asc,start_time.asc",
            SLOTS_PATH, provider_id, from, until
        );
        self.supabase.request(Method::GET, &path, None).await
    }

    async fn insert_if_absent(&self, slot: &Slot) -> Result<bool, StoreError> {
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            SLOTS_PATH,
            Some(serde_json::to_value(slot)?),
            Some(SupabaseClient::ignore_duplicates_headers()),
        ).await?;
        Ok(!rows.is_empty())
    }

    async fn delete_if(&self, slot_id: &str, guard: &SlotGuard) -> Result<bool, StoreError> {
        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &Self::guarded_path(slot_id, guard),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;
        debug!("Guarded delete of slot {} removed {} rows", slot_id, rows.len());
        Ok(!rows.is_empty())
    }

    async fn compare_and_set(
        &self,
        slot_id: &str,
        guard: &SlotGuard,
        update: &SlotUpdate,
    ) -> Result<Option<Slot>, StoreError> {
        let body = json!({
            "status": update.status,
            "appointment_id": update.appointment_id,
            "block_reason": update.block_reason,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Slot> = self.supabase.request_with_headers(
            Method::PATCH,
            &Self::guarded_path(slot_id, guard),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await?;
        Ok(rows.into_iter().next())
    }
}
