use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use schedule_cell::models::{ScheduleChanged, ScheduleError, ScheduleLayers, SlotDescriptor};
use schedule_cell::services::{generate_slots, window_end, ProviderLocks, ScheduleChangeListener, ScheduleStore};

use crate::models::{RegenerationReport, Slot, SlotError, SlotStatus, SlotView};
use crate::services::store::SlotStore;

/// Keeps persisted slots in line with each provider's schedule.
///
/// Regeneration for a provider is serialised by a per-provider lock; it may
/// interleave freely with bookings because every delete is guarded by the
/// status observed during the scan.
pub struct SlotRegistry {
    slots: Arc<dyn SlotStore>,
    schedules: Arc<dyn ScheduleStore>,
    locks: ProviderLocks,
    horizon_days: u32,
}

impl SlotRegistry {
    pub fn new(slots: Arc<dyn SlotStore>, schedules: Arc<dyn ScheduleStore>, horizon_days: u32) -> Self {
        Self {
            slots,
            schedules,
            locks: ProviderLocks::new(),
            horizon_days,
        }
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Regenerate the rolling window starting today.
    pub async fn regenerate(&self, provider_id: Uuid) -> Result<RegenerationReport, SlotError> {
        let today = Utc::now().date_naive();
        self.regenerate_range(provider_id, today, self.horizon_days).await
    }

    #[instrument(skip(self))]
    pub async fn regenerate_range(
        &self,
        provider_id: Uuid,
        start: NaiveDate,
        days: u32,
    ) -> Result<RegenerationReport, SlotError> {
        let until = window_end(start, days)?;
        let _guard = self.locks.lock(provider_id).await;

        let layers = self
            .schedules
            .load(provider_id)
            .await?
            .unwrap_or_else(|| ScheduleLayers::empty(provider_id));

        let candidates = generate_slots(&layers, start, days)?;
        let persisted = self.slots.list_for_provider(provider_id, start, until).await?;

        debug!(
            "Regenerating provider {}: {} candidates, {} persisted slots",
            provider_id,
            candidates.len(),
            persisted.len()
        );

        let mut pending: BTreeMap<String, SlotDescriptor> = candidates
            .into_iter()
            .map(|candidate| (candidate.id.clone(), candidate))
            .collect();
        let mut report = RegenerationReport::default();

        // Booked slots are authoritative: nothing may be generated on top of them.
        for slot in persisted.iter().filter(|slot| slot.is_booked()) {
            report.kept_booked += 1;
            drop_overlapping(&mut pending, slot);
        }

        for slot in persisted.iter().filter(|slot| !slot.is_booked()) {
            let still_wanted = pending
                .get(&slot.id)
                .map(|candidate| candidate.time_range == slot.time_range())
                .unwrap_or(false);

            if still_wanted {
                report.unchanged += 1;
                pending.remove(&slot.id);
                continue;
            }

            if self.slots.delete_if(&slot.id, &slot.guard()).await? {
                report.removed += 1;
                continue;
            }

            report.skipped += 1;
            match self.slots.get(&slot.id).await? {
                Some(current) if current.is_booked() => {
                    warn!(
                        "Slot {} was booked after the regeneration scan; keeping it",
                        slot.id
                    );
                    drop_overlapping(&mut pending, &current);
                }
                Some(current) => {
                    warn!(
                        "Slot {} changed to {} during regeneration; leaving it for the next pass",
                        slot.id, current.status
                    );
                    pending.remove(&slot.id);
                }
                None => debug!("Slot {} already gone", slot.id),
            }
        }

        for candidate in pending.values() {
            if self.slots.insert_if_absent(&Slot::available(candidate)).await? {
                report.created += 1;
            } else {
                report.unchanged += 1;
            }
        }

        info!(
            "Regenerated provider {} [{}, {}): created={} removed={} unchanged={} kept_booked={} skipped={}",
            provider_id,
            start,
            until,
            report.created,
            report.removed,
            report.unchanged,
            report.kept_booked,
            report.skipped
        );

        Ok(report)
    }

    /// Every persisted slot of the provider on `date`, ordered by start time.
    pub async fn slots_for_date(&self, provider_id: Uuid, date: NaiveDate) -> Result<Vec<Slot>, SlotError> {
        let until = date
            .succ_opt()
            .ok_or_else(|| ScheduleError::Validation(format!("no day follows {}", date)))?;
        Ok(self.slots.list_for_provider(provider_id, date, until).await?)
    }

    pub async fn available_slots(&self, provider_id: Uuid, date: NaiveDate) -> Result<Vec<SlotView>, SlotError> {
        Ok(self
            .slots_for_date(provider_id, date)
            .await?
            .iter()
            .filter(|slot| slot.status == SlotStatus::Available)
            .map(Slot::view)
            .collect())
    }
}

fn drop_overlapping(pending: &mut BTreeMap<String, SlotDescriptor>, slot: &Slot) {
    let occupied = slot.time_range();
    pending.remove(&slot.id);
    pending.retain(|_, candidate| !(candidate.date == slot.date && candidate.time_range.overlaps(&occupied)));
}

#[async_trait]
impl ScheduleChangeListener for SlotRegistry {
    async fn on_schedule_changed(&self, event: &ScheduleChanged) -> anyhow::Result<()> {
        debug!(
            "Schedule change {:?} for provider {} (version {})",
            event.kind, event.provider_id, event.version
        );
        self.regenerate(event.provider_id).await?;
        Ok(())
    }
}
