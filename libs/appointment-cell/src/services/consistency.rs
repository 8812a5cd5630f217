// libs/appointment-cell/src/services/consistency.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::BookingPolicy;
use slot_cell::models::{Slot, SlotStatus, SlotUpdate};
use slot_cell::services::SlotStore;

use crate::models::{BookingError, ReconciliationReport};
use crate::services::ledger::AppointmentLedger;

/// Repairs the slot/appointment pairing after partial failures, such as a
/// compensation that could not release its claim.
///
/// A claim is written before its appointment, so a booked slot younger than
/// the grace period may belong to a create or reschedule still in flight and
/// is left alone.
pub struct Reconciler {
    slots: Arc<dyn SlotStore>,
    ledger: Arc<dyn AppointmentLedger>,
    grace_period: Duration,
}

impl Reconciler {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        ledger: Arc<dyn AppointmentLedger>,
        policy: &BookingPolicy,
    ) -> Self {
        Self {
            slots,
            ledger,
            grace_period: Duration::seconds(i64::from(policy.reconcile_grace_seconds)),
        }
    }

    /// Checks every slot of the provider between `from` and `to` inclusive.
    #[instrument(skip(self))]
    pub async fn run(
        &self,
        provider_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ReconciliationReport, BookingError> {
        if to < from {
            return Err(BookingError::Validation(format!(
                "reconciliation range ends ({}) before it starts ({})",
                to, from
            )));
        }
        let until = to
            .succ_opt()
            .ok_or_else(|| BookingError::Validation(format!("no day follows {}", to)))?;

        let slots = self.slots.list_for_provider(provider_id, from, until).await?;
        let mut report = ReconciliationReport {
            checked_slots: slots.len(),
            ..ReconciliationReport::default()
        };

        let settled_before = Utc::now() - self.grace_period;
        for slot in slots.iter().filter(|slot| slot.is_booked()) {
            if slot.updated_at > settled_before {
                debug!("Slot {} was claimed at {}; too recent to judge", slot.id, slot.updated_at);
                report.deferred += 1;
                continue;
            }
            match self.orphan_reason(slot).await? {
                None => report.healthy += 1,
                Some(reason) => {
                    let released = self
                        .slots
                        .compare_and_set(&slot.id, &slot.guard(), &SlotUpdate::release())
                        .await?;
                    if released.is_some() {
                        warn!("Released orphaned slot {}: {}", slot.id, reason);
                        report.released.push(slot.id.clone());
                    } else {
                        debug!("Orphaned slot {} changed before release", slot.id);
                        report.skipped += 1;
                    }
                }
            }
        }

        let by_id: HashMap<&str, &Slot> = slots.iter().map(|slot| (slot.id.as_str(), slot)).collect();
        let appointments = self.ledger.list_for_provider(provider_id, from, until).await?;
        for appointment in appointments.iter().filter(|a| !a.status.releases_slot()) {
            let backed = by_id
                .get(appointment.slot_id.as_str())
                .map(|slot| slot.status == SlotStatus::Booked && slot.appointment_id == Some(appointment.id))
                .unwrap_or(false);
            if !backed {
                warn!(
                    "Appointment {} ({}) is not backed by slot {}",
                    appointment.id, appointment.status, appointment.slot_id
                );
                report.unbacked_appointments.push(appointment.id);
            }
        }

        info!(
            "Reconciled provider {} [{}, {}]: checked={} healthy={} released={} skipped={} deferred={} unbacked={}",
            provider_id,
            from,
            to,
            report.checked_slots,
            report.healthy,
            report.released.len(),
            report.skipped,
            report.deferred,
            report.unbacked_appointments.len()
        );

        Ok(report)
    }

    /// Why a booked slot has no live owner, or `None` if it does.
    async fn orphan_reason(&self, slot: &Slot) -> Result<Option<String>, BookingError> {
        let Some(appointment_id) = slot.appointment_id else {
            return Ok(Some("booked without an appointment reference".to_string()));
        };

        Ok(match self.ledger.get(appointment_id).await? {
            None => Some(format!("appointment {} does not exist", appointment_id)),
            Some(appointment) if appointment.status.releases_slot() => {
                Some(format!("appointment {} is {}", appointment_id, appointment.status))
            }
            Some(appointment) if appointment.slot_id != slot.id => Some(format!(
                "appointment {} now holds slot {}",
                appointment_id, appointment.slot_id
            )),
            Some(_) => None,
        })
    }
}
