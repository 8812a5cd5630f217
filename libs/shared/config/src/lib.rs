use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where slot, appointment, schedule and patient records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(StorageBackend::Memory),
            "supabase" | "postgrest" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Status an appointment carries after it has been moved to a new slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatusPolicy {
    Retain,
    ResetToPending,
}

impl FromStr for RescheduleStatusPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(RescheduleStatusPolicy::Retain),
            "reset_to_pending" | "pending" => Ok(RescheduleStatusPolicy::ResetToPending),
            other => Err(format!("unknown reschedule status policy: {}", other)),
        }
    }
}

/// Booking rules shared by the coordinator and the slot registry.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// New bookings are created `confirmed` instead of `pending`.
    pub auto_confirm_bookings: bool,
    pub reschedule_status: RescheduleStatusPolicy,
    /// Number of days, starting today, that regeneration keeps materialised.
    pub slot_horizon_days: u32,
    /// Booked slots claimed more recently than this are treated as a booking
    /// still in flight and are never released by reconciliation.
    pub reconcile_grace_seconds: u32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            auto_confirm_bookings: true,
            reschedule_status: RescheduleStatusPolicy::Retain,
            slot_horizon_days: 28,
            reconcile_grace_seconds: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub storage_backend: StorageBackend,
    pub notification_webhook_url: Option<String>,
    /// JSON array of patients loaded into the in-memory directory at startup.
    pub patient_seed_file: Option<String>,
    pub bind_addr: String,
    pub booking: BookingPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            storage_backend: StorageBackend::Memory,
            notification_webhook_url: None,
            patient_seed_file: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            booking: BookingPolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = BookingPolicy::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            storage_backend: parse_var("STORAGE_BACKEND", StorageBackend::Memory),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            patient_seed_file: env::var("PATIENT_SEED_FILE")
                .ok()
                .filter(|path| !path.trim().is_empty()),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            booking: BookingPolicy {
                auto_confirm_bookings: parse_var(
                    "AUTO_CONFIRM_BOOKINGS",
                    defaults.auto_confirm_bookings,
                ),
                reschedule_status: parse_var(
                    "RESCHEDULE_STATUS_POLICY",
                    defaults.reschedule_status,
                ),
                slot_horizon_days: parse_var("SLOT_HORIZON_DAYS", defaults.slot_horizon_days),
                reconcile_grace_seconds: parse_var(
                    "RECONCILE_GRACE_SECONDS",
                    defaults.reconcile_grace_seconds,
                ),
            },
        };

        if config.storage_backend == StorageBackend::Supabase && !config.is_configured() {
            warn!("Supabase backend selected but SUPABASE_URL / SUPABASE_ANON_PUBLIC_KEY are missing");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_var<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("{} has invalid value {:?} ({}), using default {:?}", key, raw, e, default);
            default
        }),
        Err(_) => default,
    }
}
