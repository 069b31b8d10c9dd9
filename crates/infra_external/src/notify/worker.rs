//! Notification worker
//!
//! Consumes committed bill events and delivers the tenant SMS and owner
//! email. Runs outside the request that produced the event; every
//! failure here is logged and dropped, never surfaced to a client.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::BillId;
use domain_billing::{Bill, BillEvent, BillingService, PaymentChannel};
use domain_party::{OwnerStore, Tenant, TenantStore};

use super::email::{payment_confirmed_email, EmailConfig, EmailSender};
use super::messages::MessageCatalog;
use super::sms::{SmsConfig, SmsSender};

/// Settings for the notification worker
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Base URL of the tenant-facing web app
    pub frontend_url: String,
    pub sms: SmsConfig,
    pub email: EmailConfig,
}

impl NotifierConfig {
    /// Public link to a bill
    pub fn bill_link(&self, bill_id: BillId) -> String {
        format!("{}/view-bill/{}", self.frontend_url.trim_end_matches('/'), bill_id.as_uuid())
    }
}

/// Delivers notifications for bill events
pub struct NotificationWorker {
    billing: Arc<BillingService>,
    owners: Arc<dyn OwnerStore>,
    tenants: Arc<dyn TenantStore>,
    sms: Arc<dyn SmsSender>,
    email: Arc<dyn EmailSender>,
    catalog: MessageCatalog,
    config: NotifierConfig,
}

impl NotificationWorker {
    pub fn new(
        billing: Arc<BillingService>,
        owners: Arc<dyn OwnerStore>,
        tenants: Arc<dyn TenantStore>,
        sms: Arc<dyn SmsSender>,
        email: Arc<dyn EmailSender>,
        config: NotifierConfig,
    ) -> Self {
        Self {
            billing,
            owners,
            tenants,
            sms,
            email,
            catalog: MessageCatalog::new(),
            config,
        }
    }

    /// Processes events until `shutdown` resolves, then handles whatever
    /// is already queued and stops
    ///
    /// The billing service held by the worker owns a publisher, so the
    /// channel never closes on its own.
    pub async fn run<F>(self, mut events: mpsc::UnboundedReceiver<BillEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Notification worker started");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
                () = &mut shutdown => {
                    events.close();
                    let mut drained = 0usize;
                    while let Ok(event) = events.try_recv() {
                        self.handle(event).await;
                        drained += 1;
                    }
                    info!(drained, "Queued notifications drained");
                    break;
                }
            }
        }
        info!("Notification worker stopped");
    }

    /// Handles one event
    #[instrument(skip(self, event), fields(bill_id = %event.bill_id(), event = event.event_type()))]
    pub async fn handle(&self, event: BillEvent) {
        let bill = match self.billing.get_bill(event.bill_id()).await {
            Ok(bill) => bill,
            Err(e) => {
                error!(error = %e, "Cannot load bill for notification");
                return;
            }
        };

        match event {
            BillEvent::BillCreated { .. } => self.on_bill_created(bill).await,
            BillEvent::PaymentConfirmed { channel, .. } => self.on_payment_confirmed(bill, channel).await,
        }
    }

    async fn on_bill_created(&self, bill: Bill) {
        if bill.sms_sent {
            debug!("Tenant already notified");
            return;
        }

        match self.billing.render_statement(bill.id).await {
            Ok(statement) => debug!(file = %statement.file_name, size = statement.bytes.len(), "Statement rendered"),
            Err(e) => warn!(error = %e, "Statement rendering failed"),
        }

        let Some(tenant) = self.tenant_for(&bill).await else {
            return;
        };
        let link = self.config.bill_link(bill.id);
        let text = self.catalog.bill_generated(
            tenant.language,
            &bill.month.to_string(),
            &bill.amount_money().to_fixed(),
            &link,
        );

        if self.send_sms(&tenant, text).await {
            if let Err(e) = self.billing.mark_notified(bill.id).await {
                error!(error = %e, "SMS sent but bill could not be marked notified");
            }
        }
    }

    async fn on_payment_confirmed(&self, bill: Bill, channel: PaymentChannel) {
        debug!(channel = ?channel, "Payment confirmed");
        let tenant = self.tenant_for(&bill).await;
        let amount = bill.amount_money().to_fixed();
        let month = bill.month.to_string();

        if self.config.email.is_configured() {
            match self.owners.get(bill.owner_id).await {
                Ok(Some(owner)) => {
                    let tenant_name = tenant.as_ref().map_or("Tenant", |t| t.name.as_str());
                    let message = payment_confirmed_email(&owner.email, tenant_name, &amount, &month);
                    if let Err(e) = self.email.send(message).await {
                        warn!(error = %e, "Payment confirmation email failed");
                    }
                }
                Ok(None) => warn!(owner_id = %bill.owner_id, "Owner missing; email skipped"),
                Err(e) => warn!(error = %e, "Cannot load owner; email skipped"),
            }
        } else {
            debug!("Email not configured; skipped");
        }

        if let Some(tenant) = tenant {
            let text = self.catalog.payment_received(tenant.language, &month, &amount);
            self.send_sms(&tenant, text).await;
        }
    }

    async fn tenant_for(&self, bill: &Bill) -> Option<Tenant> {
        match self.tenants.find_by_owner(bill.owner_id).await {
            Ok(Some(tenant)) => Some(tenant),
            Ok(None) => {
                warn!(owner_id = %bill.owner_id, "No tenant for bill");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cannot load tenant");
                None
            }
        }
    }

    /// Sends an SMS to the tenant; true when a message went out
    async fn send_sms(&self, tenant: &Tenant, text: Result<String, core_kernel::PortError>) -> bool {
        if !self.config.sms.is_configured() {
            debug!("SMS not configured; skipped");
            return false;
        }
        let Some(mobile) = tenant.mobile.as_deref().filter(|m| !m.trim().is_empty()) else {
            debug!("Tenant has no mobile; SMS skipped");
            return false;
        };
        let text = match text {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "SMS text could not be rendered");
                return false;
            }
        };

        let to = self.config.sms.normalize_number(mobile);
        match self.sms.send(&to, &text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, to = %to, "SMS failed");
                false
            }
        }
    }
}
