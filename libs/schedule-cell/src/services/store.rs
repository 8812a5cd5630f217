use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::models::ScheduleLayers;

/// Persistence for schedule documents. Writes are versioned: `save` only
/// succeeds when the stored document still has `expected_version`
/// (0 meaning "no document yet").
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn load(&self, provider_id: Uuid) -> Result<Option<ScheduleLayers>, StoreError>;

    async fn save(&self, layers: &ScheduleLayers, expected_version: u64) -> Result<bool, StoreError>;
}

#[derive(Default)]
pub struct InMemoryScheduleStore {
    documents: RwLock<HashMap<Uuid, ScheduleLayers>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn load(&self, provider_id: Uuid) -> Result<Option<ScheduleLayers>, StoreError> {
        Ok(self.documents.read().await.get(&provider_id).cloned())
    }

    async fn save(&self, layers: &ScheduleLayers, expected_version: u64) -> Result<bool, StoreError> {
        let mut documents = self.documents.write().await;
        let current_version = documents
            .get(&layers.provider_id)
            .map(|existing| existing.version)
            .unwrap_or(0);

        if current_version != expected_version {
            return Ok(false);
        }

        documents.insert(layers.provider_id, layers.clone());
        Ok(true)
    }
}

/// Stores each provider's layers as one row of `provider_schedules`
/// (`provider_id`, `template`, `overrides`, `leave` as JSON columns).
pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
}

impl SupabaseScheduleStore {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn load(&self, provider_id: Uuid) -> Result<Option<ScheduleLayers>, StoreError> {
        let path = format!("/rest/v1/provider_schedules?provider_id=eq.{}", provider_id);
        let rows: Vec<ScheduleLayers> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn save(&self, layers: &ScheduleLayers, expected_version: u64) -> Result<bool, StoreError> {
        let body = serde_json::to_value(layers)?;

        let rows: Vec<Value> = if expected_version == 0 {
            self.supabase.request_with_headers(
                Method::POST,
                "/rest/v1/provider_schedules",
                Some(body),
                Some(SupabaseClient::ignore_duplicates_headers()),
            ).await?
        } else {
            let path = format!(
                "/rest/v1/provider_schedules?provider_id=eq.{}&version=eq.{}",
                layers.provider_id, expected_version
            );
            self.supabase.request_with_headers(
                Method::PATCH,
                &path,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            ).await?
        };

        debug!(
            "Schedule save for provider {} at version {} affected {} rows",
            layers.provider_id, layers.version, rows.len()
        );
        Ok(!rows.is_empty())
    }
}
