use std::fs;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use appointment_cell::services::{
    AppointmentLedger, BookingCoordinator, InMemoryAppointmentLedger,
    LoggingNotificationDispatcher, NotificationDispatcher, Reconciler,
    SupabaseAppointmentLedger, WebhookNotificationDispatcher,
};
use patient_cell::models::Patient;
use patient_cell::services::{InMemoryPatientDirectory, PatientDirectory, SupabasePatientDirectory};
use schedule_cell::services::{InMemoryScheduleStore, ScheduleService, ScheduleStore, SupabaseScheduleStore};
use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use slot_cell::services::{InMemorySlotStore, SlotRegistry, SlotStore, SupabaseSlotStore};

/// Everything the routers need, wired once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub schedules: Arc<ScheduleService>,
    pub registry: Arc<SlotRegistry>,
    pub coordinator: Arc<BookingCoordinator>,
    pub reconciler: Arc<Reconciler>,
}

struct Stores {
    schedules: Arc<dyn ScheduleStore>,
    slots: Arc<dyn SlotStore>,
    ledger: Arc<dyn AppointmentLedger>,
    patients: Arc<dyn PatientDirectory>,
}

impl AppServices {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let stores = match config.storage_backend {
            StorageBackend::Supabase if config.is_configured() => {
                info!("Using Supabase storage at {}", config.supabase_url);
                let supabase = SupabaseClient::new(config);
                Stores {
                    schedules: Arc::new(SupabaseScheduleStore::new(supabase.clone())),
                    slots: Arc::new(SupabaseSlotStore::new(supabase.clone())),
                    ledger: Arc::new(SupabaseAppointmentLedger::new(supabase.clone())),
                    patients: Arc::new(SupabasePatientDirectory::new(supabase)),
                }
            }
            backend => {
                if backend == StorageBackend::Supabase {
                    warn!("Supabase storage requested but not configured; using in-memory stores");
                } else {
                    info!("Using in-memory storage");
                }
                Stores {
                    schedules: Arc::new(InMemoryScheduleStore::new()),
                    slots: Arc::new(InMemorySlotStore::new()),
                    ledger: Arc::new(InMemoryAppointmentLedger::new()),
                    patients: Arc::new(in_memory_patients(config)?),
                }
            }
        };

        let notifier: Arc<dyn NotificationDispatcher> = match &config.notification_webhook_url {
            Some(url) => Arc::new(WebhookNotificationDispatcher::new(url.clone())),
            None => Arc::new(LoggingNotificationDispatcher),
        };

        Ok(Self::assemble(stores, notifier, config))
    }

    fn assemble(stores: Stores, notifier: Arc<dyn NotificationDispatcher>, config: &AppConfig) -> Self {
        let registry = Arc::new(SlotRegistry::new(
            stores.slots.clone(),
            stores.schedules.clone(),
            config.booking.slot_horizon_days,
        ));
        let schedules = Arc::new(
            ScheduleService::new(stores.schedules).with_listener(registry.clone()),
        );
        let coordinator = Arc::new(BookingCoordinator::new(
            stores.slots.clone(),
            stores.ledger.clone(),
            stores.patients,
            notifier,
            config.booking.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(stores.slots, stores.ledger, &config.booking));

        Self {
            schedules,
            registry,
            coordinator,
            reconciler,
        }
    }
}

fn in_memory_patients(config: &AppConfig) -> anyhow::Result<InMemoryPatientDirectory> {
    let Some(path) = config.patient_seed_file.as_deref() else {
        warn!("PATIENT_SEED_FILE not set; in-memory patient directory is empty");
        return Ok(InMemoryPatientDirectory::new());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading patient seed file {}", path))?;
    let patients: Vec<Patient> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing patient seed file {}", path))?;
    info!("Seeded {} patients from {}", patients.len(), path);

    Ok(InMemoryPatientDirectory::with_patients(patients))
}
