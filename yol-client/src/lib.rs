pub mod booking;
pub mod error;
pub mod http;
pub mod sync;

pub use booking::BookingService;
pub use error::ClientError;
pub use http::BackendClient;
pub use sync::{LogNotifier, NotificationSync, Notifier, SyncOutcome, SyncScheduler};
