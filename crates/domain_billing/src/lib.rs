//! Billing Domain
//!
//! This crate turns monthly meter readings into bills and reconciles
//! their payment:
//!
//! - **Readings**: each bill's previous reading is the current reading of
//!   the owner's latest bill, so readings form a monotone chain.
//! - **Amounts**: `units * unit_rate`, stored exactly. Rounding happens
//!   only for display and for gateway minor units.
//! - **Payments**: a bill is paid manually over UPI (tenant claims, owner
//!   confirms) or through a hosted gateway checkout. Both paths feed one
//!   state machine on [`Bill`].
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingService, CreateBill};
//!
//! let bill = service
//!     .create_bill(owner_id, CreateBill {
//!         month: "2024-03".into(),
//!         current_reading: dec!(150),
//!         photo: Some(upload),
//!         revision_of: None,
//!     })
//!     .await?;
//! ```

pub mod reading;
pub mod bill;
pub mod payment;
pub mod upi;
pub mod signature;
pub mod webhook;
pub mod events;
pub mod view;
pub mod ports;
pub mod services;
pub mod error;

pub use reading::{calculate, Consumption};
pub use bill::{Bill, BillStatus, NewBill, Settlement};
pub use payment::{GatewayPayment, ManualPayment, PaymentRecord, PaymentStatus};
pub use upi::{build_upi_link, UpiRequest};
pub use signature::GatewaySecrets;
pub use webhook::WebhookEvent;
pub use events::{BillEvent, PaymentChannel};
pub use view::{BillView, CheckoutOrder, OwnerSummary, PaymentStatusView, Statement, TenantSummary};
pub use ports::{
    BillStore, EventPublisher, GatewayOrder, OrderRequest, PaymentGateway, PhotoStorage,
    PhotoUpload, StatementRenderer,
};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{
    InMemoryBillStore, MockPaymentGateway, MockPhotoStorage, MockStatementRenderer,
    RecordingPublisher,
};
pub use services::{BillingPorts, BillingService, CreateBill, GatewayConfirmation, WebhookOutcome};
pub use error::{BillingError, ErrorKind};
