pub mod registry;
pub mod store;
pub mod supabase;

pub use registry::SlotRegistry;
pub use store::{InMemorySlotStore, SlotStore};
pub use supabase::SupabaseSlotStore;
