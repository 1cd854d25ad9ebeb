pub mod notification_dispatcher;
pub mod notification_handlers;
pub mod notification_scheduler;

pub use notification_dispatcher::NotificationDispatcher;
pub use notification_handlers::*;
pub use notification_scheduler::{DailyTrigger, DigestSchedule};
