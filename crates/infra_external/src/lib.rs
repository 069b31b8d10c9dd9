//! External Collaborators
//!
//! Adapters for everything MeterProof talks to outside its database:
//!
//! - **Photo storage**: meter photos written to a local directory and
//!   served back under `/photos`
//! - **Statements**: printable HTML bill statements
//! - **Payment gateway**: sandbox order creation with HMAC-signed
//!   confirmations
//! - **Notifications**: localized tenant SMS and owner email, delivered
//!   by a background worker fed from an in-process event channel

pub mod storage;
pub mod statement;
pub mod gateway;
pub mod notify;

pub use storage::{LocalPhotoStorage, LocalStorageConfig};
pub use statement::HtmlStatementRenderer;
pub use gateway::SandboxGateway;
pub use notify::{
    ChannelPublisher, EmailConfig, EmailSender, LogEmailSender, LogSmsSender, MessageCatalog,
    NotificationWorker, NotifierConfig, SmsConfig, SmsSender,
};
#[cfg(any(test, feature = "mock"))]
pub use notify::{RecordingEmailSender, RecordingSmsSender};
