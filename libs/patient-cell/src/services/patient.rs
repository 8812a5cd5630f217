use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::models::Patient;

/// Find-or-reject lookup of existing patients. There is no implicit upsert:
/// an id that does not resolve is simply absent.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryPatientDirectory {
    patients: RwLock<HashMap<Uuid, Patient>>,
}

impl InMemoryPatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patients(patients: impl IntoIterator<Item = Patient>) -> Self {
        Self {
            patients: RwLock::new(patients.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    /// Seeds the directory; registration itself happens elsewhere.
    pub async fn insert(&self, patient: Patient) {
        self.patients.write().await.insert(patient.id, patient);
    }
}

#[async_trait]
impl PatientDirectory for InMemoryPatientDirectory {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, StoreError> {
        Ok(self.patients.read().await.get(&patient_id).cloned())
    }
}

pub struct SupabasePatientDirectory {
    supabase: SupabaseClient,
}

impl SupabasePatientDirectory {
    pub fn new(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PatientDirectory for SupabasePatientDirectory {
    async fn find_patient(&self, patient_id: Uuid) -> Result<Option<Patient>, StoreError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&select=id,first_name,last_name,email,phone_number",
            patient_id
        );
        let result: Vec<Patient> = self.supabase.request(Method::GET, &path, None).await?;

        Ok(result.into_iter().next())
    }
}
