//! Tenant and owner notifications

pub mod email;
pub mod messages;
pub mod publisher;
pub mod sms;
pub mod worker;

pub use email::{payment_confirmed_email, verification_email, EmailConfig, EmailMessage, EmailSender, LogEmailSender};
pub use messages::{MessageCatalog, MessageKey};
pub use publisher::ChannelPublisher;
pub use sms::{LogSmsSender, SmsConfig, SmsSender};
pub use worker::{NotificationWorker, NotifierConfig};

#[cfg(any(test, feature = "mock"))]
pub use email::RecordingEmailSender;
#[cfg(any(test, feature = "mock"))]
pub use sms::RecordingSmsSender;
