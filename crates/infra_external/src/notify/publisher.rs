//! In-process event channel between the billing service and the
//! notification worker

use tokio::sync::mpsc;
use tracing::warn;

use domain_billing::{BillEvent, EventPublisher};

/// Publisher that forwards events to a worker over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::UnboundedSender<BillEvent>,
}

impl ChannelPublisher {
    pub fn new(sender: mpsc::UnboundedSender<BillEvent>) -> Self {
        Self { sender }
    }

    /// Creates a publisher and the receiver its events arrive on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BillEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: BillEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!(bill_id = %e.0.bill_id(), event = e.0.event_type(), "Notification worker gone; event dropped");
        }
    }
}
