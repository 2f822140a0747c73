pub mod app_config;
pub mod session;
pub mod trip_repo;
pub mod notification_repo;
pub mod users;

pub use session::{MemorySessionStore, Session, SessionStore};
pub use trip_repo::{StoreError, TripQuery, TripRecord, TripStore};
pub use notification_repo::{Notification, NotificationKind, NotificationLog};
pub use users::{UserDirectory, UserProfile};
