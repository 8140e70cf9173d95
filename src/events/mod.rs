use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::transfer::TransferStatus;

/// Domain events published after successful state mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Warehouse events
    WarehouseRegistered(Uuid),
    WarehouseUpdated(Uuid),
    WarehouseDeactivated(Uuid),
    WarehouseDeleted(Uuid),

    // Inventory events
    InventoryReceived {
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    },
    InventoryReserved {
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    },
    InventoryReleased {
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    },

    // Transfer events
    TransferCreated {
        transfer_id: Uuid,
        source_warehouse_id: Uuid,
        destination_warehouse_id: Uuid,
    },
    TransferStatusChanged {
        transfer_id: Uuid,
        old_status: TransferStatus,
        new_status: TransferStatus,
    },

    // Planning events
    RebalancingPlanGenerated {
        plan_id: Uuid,
        transfer_count: usize,
    },
}

/// Sending half of the event channel, cloned into every service.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Creates a bounded event channel pair.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel, logging each event. Consumers that need to
/// react to events (webhooks, projections) replace this loop with their
/// own receiver.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::TransferStatusChanged {
                transfer_id,
                old_status,
                new_status,
            } => {
                info!(
                    transfer_id = %transfer_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Transfer status changed"
                );
            }
            other => debug!(?other, "Domain event"),
        }
    }
}
