//! Event bus adapters.
//!
//! - `InMemoryEventBus` - Synchronous, in-process bus
//! - `LoggingNotificationHandler` - Subscriber that logs notification events

mod in_memory;
mod notification_logger;

pub use in_memory::InMemoryEventBus;
pub use notification_logger::{LoggingNotificationHandler, NOTIFICATION_EVENTS};
