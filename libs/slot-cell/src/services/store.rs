use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::StoreError;

use crate::models::{Slot, SlotGuard, SlotUpdate};

/// Slot persistence. Every write is conditional on a single slot key, which
/// is the only synchronisation the booking engine relies on.
#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn get(&self, slot_id: &str) -> Result<Option<Slot>, StoreError>;

    /// Slots of one provider with `from <= date < until`, ordered by date and
    /// start time.
    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError>;

    /// Returns false when a slot with the same id already exists.
    async fn insert_if_absent(&self, slot: &Slot) -> Result<bool, StoreError>;

    /// Deletes the slot only if it still matches `guard`.
    async fn delete_if(&self, slot_id: &str, guard: &SlotGuard) -> Result<bool, StoreError>;

    /// Applies `update` only if the slot still matches `guard`; returns the
    /// updated slot, or `None` when the guard did not match.
    async fn compare_and_set(
        &self,
        slot_id: &str,
        guard: &SlotGuard,
        update: &SlotUpdate,
    ) -> Result<Option<Slot>, StoreError>;
}

/// Process-local store. Each call runs inside one write-lock critical section,
/// so guarded writes are atomic with respect to each other.
#[derive(Default)]
pub struct InMemorySlotStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl InMemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn get(&self, slot_id: &str) -> Result<Option<Slot>, StoreError> {
        Ok(self.slots.read().await.get(slot_id).cloned())
    }

    async fn list_for_provider(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let slots = self.slots.read().await;
        let mut matching: Vec<Slot> = slots
            .values()
            .filter(|slot| slot.provider_id == provider_id && slot.date >= from && slot.date < until)
            .cloned()
            .collect();
        matching.sort_by_key(|slot| (slot.date, slot.start_time));
        Ok(matching)
    }

    async fn insert_if_absent(&self, slot: &Slot) -> Result<bool, StoreError> {
        let mut slots = self.slots.write().await;
        if slots.contains_key(&slot.id) {
            return Ok(false);
        }
        slots.insert(slot.id.clone(), slot.clone());
        Ok(true)
    }

    async fn delete_if(&self, slot_id: &str, guard: &SlotGuard) -> Result<bool, StoreError> {
        let mut slots = self.slots.write().await;
        match slots.get(slot_id) {
            Some(slot) if guard.matches(slot) => {
                slots.remove(slot_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn compare_and_set(
        &self,
        slot_id: &str,
        guard: &SlotGuard,
        update: &SlotUpdate,
    ) -> Result<Option<Slot>, StoreError> {
        let mut slots = self.slots.write().await;
        match slots.get_mut(slot_id) {
            Some(slot) if guard.matches(slot) => {
                update.apply_to(slot);
                Ok(Some(slot.clone()))
            }
            _ => Ok(None),
        }
    }
}
