// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use patient_cell::models::Patient;
use patient_cell::services::PatientDirectory;
use shared_config::{BookingPolicy, RescheduleStatusPolicy};
use shared_models::TimeRange;
use slot_cell::models::{slot_id, Slot, SlotGuard, SlotStatus, SlotUpdate};
use slot_cell::services::SlotStore;

use crate::models::{
    Appointment, AppointmentStatus, BookingError, CancelAppointmentRequest,
    CreateAppointmentRequest, RescheduleAppointmentRequest, UpdateStatusRequest,
};
use crate::services::ledger::AppointmentLedger;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notification::{Notification, NotificationDispatcher};

/// The only writer of slot ownership and appointment status.
///
/// Every slot change is one `compare_and_set` on one slot key, so concurrent
/// callers racing for the same slot are arbitrated by the store and never by
/// an in-process lock.
pub struct BookingCoordinator {
    slots: Arc<dyn SlotStore>,
    ledger: Arc<dyn AppointmentLedger>,
    patients: Arc<dyn PatientDirectory>,
    notifier: Arc<dyn NotificationDispatcher>,
    lifecycle_service: AppointmentLifecycleService,
    policy: BookingPolicy,
}

impl BookingCoordinator {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        ledger: Arc<dyn AppointmentLedger>,
        patients: Arc<dyn PatientDirectory>,
        notifier: Arc<dyn NotificationDispatcher>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            slots,
            ledger,
            patients,
            notifier,
            lifecycle_service: AppointmentLifecycleService::new(),
            policy,
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    #[instrument(skip(self, request), fields(provider_id = %request.provider_id, date = %request.date))]
    pub async fn create(&self, request: CreateAppointmentRequest) -> Result<Appointment, BookingError> {
        validate_range(&request.time_range)?;

        let slot = self
            .resolve_slot(request.provider_id, request.date, &request.time_range)
            .await?;
        let appointment_id = Uuid::new_v4();
        self.claim(&slot.id, appointment_id).await?;

        match self.record_booking(appointment_id, &slot, &request).await {
            Ok((appointment, patient)) => {
                info!(
                    "Appointment {} booked in slot {} for patient {}",
                    appointment.id, appointment.slot_id, appointment.patient_id
                );
                self.notify(&appointment, Some(&patient), "appointment_booked").await;
                Ok(appointment)
            }
            Err(e) => {
                self.release(&slot.id, appointment_id).await;
                Err(e)
            }
        }
    }

    async fn record_booking(
        &self,
        appointment_id: Uuid,
        slot: &Slot,
        request: &CreateAppointmentRequest,
    ) -> Result<(Appointment, Patient), BookingError> {
        let patient = self
            .patients
            .find_patient(request.patient_id)
            .await?
            .ok_or(BookingError::RegistrationRequired {
                patient_id: request.patient_id,
            })?;

        let status = if self.policy.auto_confirm_bookings {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        };
        let now = Utc::now();
        let appointment = Appointment {
            id: appointment_id,
            patient_id: patient.id,
            provider_id: request.provider_id,
            slot_id: slot.id.clone(),
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status,
            last_modified_by: request.modified_by.clone(),
            notes: request.notes.clone(),
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.ledger.insert(&appointment).await?;
        Ok((appointment, patient))
    }

    #[instrument(skip(self, request))]
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let current = self.get_appointment(appointment_id).await?;
        self.lifecycle_service.validate_reschedule(current.status)?;
        validate_range(&request.time_range)?;

        let target = self
            .resolve_slot(current.provider_id, request.date, &request.time_range)
            .await?;
        if target.id == current.slot_id {
            return Err(BookingError::Validation(format!(
                "Appointment {} already occupies slot {}",
                appointment_id, target.id
            )));
        }

        self.claim(&target.id, appointment_id).await?;

        let mut updated = current.clone();
        updated.slot_id = target.id.clone();
        updated.date = target.date;
        updated.start_time = target.start_time;
        updated.end_time = target.end_time;
        updated.last_modified_by = request.modified_by;
        updated.updated_at = Utc::now();
        if self.policy.reschedule_status == RescheduleStatusPolicy::ResetToPending {
            updated.status = AppointmentStatus::Pending;
        }

        let saved = match self.ledger.update_if(&updated, &current.guard()).await {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                warn!("Appointment {} changed during reschedule; undoing claim", appointment_id);
                self.release(&target.id, appointment_id).await;
                return Err(BookingError::InvalidTransition {
                    from: current.status,
                    action: "reschedule".to_string(),
                });
            }
            Err(e) => {
                self.release(&target.id, appointment_id).await;
                return Err(e.into());
            }
        };

        self.release(&current.slot_id, appointment_id).await;

        info!(
            "Appointment {} moved from slot {} to {}",
            appointment_id, current.slot_id, saved.slot_id
        );
        self.notify(&saved, None, "appointment_rescheduled").await;
        Ok(saved)
    }

    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        self.transition(
            appointment_id,
            AppointmentStatus::Cancelled,
            request.modified_by,
            request.reason,
        )
        .await
    }

    pub async fn mark_status(
        &self,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Appointment, BookingError> {
        self.transition(appointment_id, request.status, request.modified_by, None)
            .await
    }

    #[instrument(skip(self, modified_by, reason))]
    async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        modified_by: String,
        reason: Option<String>,
    ) -> Result<Appointment, BookingError> {
        let current = self.get_appointment(appointment_id).await?;
        self.lifecycle_service
            .validate_status_transition(current.status, new_status)?;

        let mut updated = current.clone();
        updated.status = new_status;
        updated.last_modified_by = modified_by;
        updated.updated_at = Utc::now();
        if new_status == AppointmentStatus::Cancelled {
            updated.cancellation_reason = reason;
        }

        let saved = self
            .ledger
            .update_if(&updated, &current.guard())
            .await?
            .ok_or_else(|| BookingError::InvalidTransition {
                from: current.status,
                action: format!("mark as {}", new_status),
            })?;

        if new_status.releases_slot() {
            self.release(&saved.slot_id, appointment_id).await;
        }

        info!("Appointment {} is now {}", appointment_id, new_status);
        let event = match new_status {
            AppointmentStatus::Cancelled => "appointment_cancelled",
            _ => "appointment_status_changed",
        };
        self.notify(&saved, None, event).await;
        Ok(saved)
    }

    // ==========================================================================
    // ADMINISTRATIVE HOLDS
    // ==========================================================================

    pub async fn block_slot(&self, slot_id: &str, reason: Option<String>) -> Result<Slot, BookingError> {
        match self
            .slots
            .compare_and_set(slot_id, &SlotGuard::available(), &SlotUpdate::block(reason))
            .await?
        {
            Some(slot) => {
                info!("Slot {} blocked", slot_id);
                Ok(slot)
            }
            None => Err(self.explain_failed_hold(slot_id).await?),
        }
    }

    pub async fn unblock_slot(&self, slot_id: &str) -> Result<Slot, BookingError> {
        match self
            .slots
            .compare_and_set(slot_id, &SlotGuard::blocked(), &SlotUpdate::release())
            .await?
        {
            Some(slot) => {
                info!("Slot {} unblocked", slot_id);
                Ok(slot)
            }
            None => Err(self.explain_failed_hold(slot_id).await?),
        }
    }

    async fn explain_failed_hold(&self, slot_id: &str) -> Result<BookingError, BookingError> {
        Ok(match self.slots.get(slot_id).await? {
            None => BookingError::NotFound(format!("Slot {}", slot_id)),
            Some(_) => BookingError::slot_unavailable(slot_id),
        })
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.ledger
            .get(appointment_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Appointment {}", appointment_id)))
    }

    pub async fn list_for_provider(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, BookingError> {
        let until = date
            .succ_opt()
            .ok_or_else(|| BookingError::Validation(format!("no day follows {}", date)))?;
        Ok(self.ledger.list_for_provider(provider_id, date, until).await?)
    }

    // ==========================================================================
    // SLOT OWNERSHIP
    // ==========================================================================

    /// The persisted slot for exactly this provider, date and range.
    async fn resolve_slot(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        time_range: &TimeRange,
    ) -> Result<Slot, BookingError> {
        let key = slot_id(provider_id, date, time_range.start);
        match self.slots.get(&key).await? {
            Some(slot) if slot.time_range() == *time_range => Ok(slot),
            Some(slot) => {
                debug!(
                    "Slot {} spans {} but {} was requested",
                    key,
                    slot.time_range(),
                    time_range
                );
                Err(BookingError::slot_unavailable(&key))
            }
            None => Err(BookingError::slot_unavailable(&key)),
        }
    }

    async fn claim(&self, slot_id: &str, appointment_id: Uuid) -> Result<(), BookingError> {
        let claimed = self
            .slots
            .compare_and_set(slot_id, &SlotGuard::available(), &SlotUpdate::book(appointment_id))
            .await?;

        match claimed {
            Some(slot) if slot.status == SlotStatus::Booked => {
                debug!("Slot {} claimed for appointment {}", slot_id, appointment_id);
                Ok(())
            }
            _ => {
                debug!("Slot {} lost to another claim", slot_id);
                Err(BookingError::slot_unavailable(slot_id))
            }
        }
    }

    /// Hands a slot back if and only if `appointment_id` still owns it. A
    /// failure leaves the slot for the reconciliation pass.
    async fn release(&self, slot_id: &str, appointment_id: Uuid) {
        match self
            .slots
            .compare_and_set(slot_id, &SlotGuard::booked_by(appointment_id), &SlotUpdate::release())
            .await
        {
            Ok(Some(_)) => debug!("Slot {} released by appointment {}", slot_id, appointment_id),
            Ok(None) => warn!(
                "Slot {} was no longer held by appointment {}; nothing released",
                slot_id, appointment_id
            ),
            Err(e) => error!(
                "Failed to release slot {} for appointment {}: {}",
                slot_id, appointment_id, e
            ),
        }
    }

    // ==========================================================================
    // NOTIFICATIONS
    // ==========================================================================

    async fn notify(&self, appointment: &Appointment, patient: Option<&Patient>, event: &str) {
        let patient = match patient {
            Some(patient) => patient.clone(),
            None => match self.patients.find_patient(appointment.patient_id).await {
                Ok(Some(patient)) => patient,
                Ok(None) => {
                    warn!("No patient {} to notify about {}", appointment.patient_id, event);
                    return;
                }
                Err(e) => {
                    warn!("Patient lookup for {} notification failed: {}", event, e);
                    return;
                }
            },
        };

        let Some((channel, recipient)) = patient.contact() else {
            debug!("Patient {} has no contact details; skipping {}", patient.id, event);
            return;
        };

        let notification = Notification {
            channel: channel.to_string(),
            recipient: recipient.to_string(),
            template_data: json!({
                "event": event,
                "appointment_id": appointment.id,
                "patient_name": patient.full_name(),
                "provider_id": appointment.provider_id,
                "date": appointment.date,
                "start_time": appointment.start_time,
                "end_time": appointment.end_time,
                "status": appointment.status,
            }),
        };

        if let Err(e) = self.notifier.dispatch(&notification).await {
            warn!("Notification {} for appointment {} failed: {}", event, appointment.id, e);
        }
    }
}

fn validate_range(time_range: &TimeRange) -> Result<(), BookingError> {
    time_range
        .validate()
        .map_err(|e| BookingError::Validation(e.to_string()))
}
