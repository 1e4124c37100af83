//! Notification channels for reference events
//!
//! Exactly one email and one push job go out per successful creation,
//! after the record is persisted.

pub mod email;
pub mod push;

pub use email::{EmailJob, EmailNotifier, EmailTemplate, LogEmailNotifier, NatsEmailNotifier};
pub use push::{LogPushNotifier, NatsPushNotifier, PushJob, PushNotifier};
