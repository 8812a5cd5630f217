pub mod patient;

pub use patient::{InMemoryPatientDirectory, PatientDirectory, SupabasePatientDirectory};
