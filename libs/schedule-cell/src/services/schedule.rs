use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CreateLeaveRequest, DateOverride, LeaveInterval, ScheduleChangeKind, ScheduleChanged,
    ScheduleError, ScheduleLayers, SetDateOverrideRequest, WeeklyTemplate,
};
use crate::services::generator::validate_layers;
use crate::services::locks::ProviderLocks;
use crate::services::store::ScheduleStore;

/// Receives a notification after every committed schedule edit.
#[async_trait]
pub trait ScheduleChangeListener: Send + Sync {
    async fn on_schedule_changed(&self, event: &ScheduleChanged) -> anyhow::Result<()>;
}

/// Administrative entry point for schedule layers. Each edit loads the
/// current document, builds a replacement, saves it against the previous
/// version and then tells every listener.
pub struct ScheduleService {
    store: Arc<dyn ScheduleStore>,
    listeners: Vec<Arc<dyn ScheduleChangeListener>>,
    locks: ProviderLocks,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self {
            store,
            listeners: Vec::new(),
            locks: ProviderLocks::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ScheduleChangeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Current layers; an unknown provider has an empty schedule.
    pub async fn get_schedule(&self, provider_id: Uuid) -> Result<ScheduleLayers, ScheduleError> {
        Ok(self
            .store
            .load(provider_id)
            .await?
            .unwrap_or_else(|| ScheduleLayers::empty(provider_id)))
    }

    pub async fn set_weekly_template(
        &self,
        provider_id: Uuid,
        template: WeeklyTemplate,
    ) -> Result<ScheduleLayers, ScheduleError> {
        debug!("Replacing weekly template for provider {}", provider_id);

        self.edit(provider_id, ScheduleChangeKind::WeeklyTemplate, move |layers| {
            layers.template = Some(template);
            Ok(())
        })
        .await
    }

    pub async fn set_date_override(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        request: SetDateOverrideRequest,
    ) -> Result<ScheduleLayers, ScheduleError> {
        debug!("Setting override for provider {} on {}", provider_id, date);

        self.edit(provider_id, ScheduleChangeKind::DateOverride, move |layers| {
            layers.overrides.insert(
                date,
                DateOverride {
                    date,
                    windows: request.windows,
                    slot_duration_minutes: request.slot_duration_minutes,
                    reason: request.reason,
                },
            );
            Ok(())
        })
        .await
    }

    pub async fn remove_date_override(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<ScheduleLayers, ScheduleError> {
        self.edit(provider_id, ScheduleChangeKind::DateOverride, move |layers| {
            layers
                .overrides
                .remove(&date)
                .map(|_| ())
                .ok_or_else(|| ScheduleError::NotFound(format!("no override on {}", date)))
        })
        .await
    }

    pub async fn add_leave(
        &self,
        provider_id: Uuid,
        request: CreateLeaveRequest,
    ) -> Result<(LeaveInterval, ScheduleLayers), ScheduleError> {
        let interval = LeaveInterval {
            id: Uuid::new_v4(),
            start_date: request.start_date,
            end_date: request.end_date,
            reason: request.reason,
        };

        let added = interval.clone();
        let layers = self
            .edit(provider_id, ScheduleChangeKind::Leave, move |layers| {
                layers.leave.push(added);
                Ok(())
            })
            .await?;

        Ok((interval, layers))
    }

    pub async fn remove_leave(
        &self,
        provider_id: Uuid,
        leave_id: Uuid,
    ) -> Result<ScheduleLayers, ScheduleError> {
        self.edit(provider_id, ScheduleChangeKind::Leave, move |layers| {
            let before = layers.leave.len();
            layers.leave.retain(|interval| interval.id != leave_id);
            if layers.leave.len() == before {
                return Err(ScheduleError::NotFound(format!("leave {}", leave_id)));
            }
            Ok(())
        })
        .await
    }

    async fn edit<F>(
        &self,
        provider_id: Uuid,
        kind: ScheduleChangeKind,
        apply: F,
    ) -> Result<ScheduleLayers, ScheduleError>
    where
        F: FnOnce(&mut ScheduleLayers) -> Result<(), ScheduleError>,
    {
        let _guard = self.locks.lock(provider_id).await;

        let current = self.get_schedule(provider_id).await?;
        let mut next = current.clone();
        apply(&mut next)?;
        next.version = current.version + 1;
        next.updated_at = Utc::now();

        validate_layers(&next)?;

        if !self.store.save(&next, current.version).await? {
            warn!(
                "Schedule for provider {} changed underneath edit (expected version {})",
                provider_id, current.version
            );
            return Err(ScheduleError::Conflict(format!(
                "schedule for provider {} was modified concurrently",
                provider_id
            )));
        }

        info!("Schedule for provider {} now at version {}", provider_id, next.version);

        let event = ScheduleChanged {
            provider_id,
            kind,
            version: next.version,
        };
        self.publish(&event).await;

        Ok(next)
    }

    async fn publish(&self, event: &ScheduleChanged) {
        for listener in &self.listeners {
            if let Err(e) = listener.on_schedule_changed(event).await {
                // The edit is committed; a failed listener can be re-driven
                // through a manual regeneration.
                warn!(
                    "Schedule listener failed for provider {} ({:?}): {:#}",
                    event.provider_id, event.kind, e
                );
            }
        }
    }
}
