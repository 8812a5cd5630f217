pub mod generator;
pub mod locks;
pub mod schedule;
pub mod store;

pub use generator::{generate_slots, window_end, MAX_GENERATION_DAYS};
pub use locks::ProviderLocks;
pub use schedule::{ScheduleChangeListener, ScheduleService};
pub use store::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
