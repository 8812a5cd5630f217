pub mod booking;
pub mod consistency;
pub mod ledger;
pub mod lifecycle;
pub mod notification;

pub use booking::BookingCoordinator;
pub use consistency::Reconciler;
pub use ledger::{AppointmentLedger, InMemoryAppointmentLedger, SupabaseAppointmentLedger};
pub use lifecycle::AppointmentLifecycleService;
pub use notification::{
    LoggingNotificationDispatcher, Notification, NotificationDispatcher, NotificationError,
    WebhookNotificationDispatcher,
};
