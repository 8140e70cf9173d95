//! Inter-warehouse transfer orchestration.
//!
//! Drives the `Pending -> InTransit -> Received | Cancelled` state machine
//! and applies the matching inventory side-effects through the ledger
//! service, so a transfer can never mutate stock outside the locked write
//! path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::transfer::{
    InventoryTransfer, TransferItem, TransferReason, TransferStatus,
};
use crate::repositories::{TransferRepository, WarehouseRepository};
use crate::services::inventory::InventoryService;

lazy_static! {
    static ref TRANSFERS_CREATED: IntCounter = IntCounter::new(
        "inventory_transfers_total",
        "Total number of inventory transfers created"
    )
    .expect("metric can be created");
    static ref TRANSFER_FAILURES: IntCounter = IntCounter::new(
        "inventory_transfer_failures_total",
        "Total number of failed inventory transfer operations"
    )
    .expect("metric can be created");
}

/// Input for creating a transfer.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferDraft {
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    #[validate(length(min = 1, message = "Transfer needs at least one item"))]
    pub items: Vec<TransferItem>,
    pub reason: TransferReason,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}

/// Service owning the transfer lifecycle.
#[derive(Clone)]
pub struct TransferService {
    repo: Arc<dyn TransferRepository>,
    warehouse_repo: Arc<dyn WarehouseRepository>,
    inventory: InventoryService,
    event_sender: EventSender,
}

impl TransferService {
    pub fn new(
        repo: Arc<dyn TransferRepository>,
        warehouse_repo: Arc<dyn WarehouseRepository>,
        inventory: InventoryService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            repo,
            warehouse_repo,
            inventory,
            event_sender,
        }
    }

    /// Creates a transfer in `Pending` state, staging the source
    /// inventory (`available -> in_transit`) for every item. Validation
    /// or staging failure leaves the ledger untouched.
    #[instrument(skip(self, draft))]
    pub async fn create_transfer(
        &self,
        draft: TransferDraft,
    ) -> Result<InventoryTransfer, ServiceError> {
        draft.validate().map_err(|e| {
            TRANSFER_FAILURES.inc();
            ServiceError::validation(e)
        })?;
        if draft.items.iter().any(|i| i.quantity < 1) {
            TRANSFER_FAILURES.inc();
            return Err(ServiceError::Validation(
                "Transfer item quantities must be at least 1".to_string(),
            ));
        }
        if draft.source_warehouse_id == draft.destination_warehouse_id {
            TRANSFER_FAILURES.inc();
            return Err(ServiceError::Validation(
                "Cannot transfer inventory to the same warehouse".to_string(),
            ));
        }
        self.require_warehouse(draft.source_warehouse_id).await?;
        self.require_warehouse(draft.destination_warehouse_id).await?;

        self.inventory
            .stage_outbound(draft.source_warehouse_id, &draft.items)
            .await
            .map_err(|e| {
                TRANSFER_FAILURES.inc();
                e
            })?;

        let transfer = InventoryTransfer {
            id: Uuid::new_v4(),
            source_warehouse_id: draft.source_warehouse_id,
            destination_warehouse_id: draft.destination_warehouse_id,
            items: draft.items,
            status: TransferStatus::Pending,
            reason: draft.reason,
            initiated_at: Utc::now(),
            shipment_date: None,
            estimated_delivery: draft.estimated_delivery,
            actual_delivery: None,
            cost: draft.cost,
            notes: draft.notes,
        };
        if let Err(e) = self.repo.upsert(transfer.clone()).await {
            // Undo the staging so a storage failure is not a silent
            // reservation leak.
            error!(error = %e, transfer_id = %transfer.id, "Failed to persist transfer; releasing staged stock");
            self.inventory
                .release_outbound(transfer.source_warehouse_id, &transfer.items)
                .await?;
            TRANSFER_FAILURES.inc();
            return Err(e);
        }

        self.event_sender
            .send(Event::TransferCreated {
                transfer_id: transfer.id,
                source_warehouse_id: transfer.source_warehouse_id,
                destination_warehouse_id: transfer.destination_warehouse_id,
            })
            .await
            .map_err(ServiceError::Event)?;

        TRANSFERS_CREATED.inc();
        info!(
            transfer_id = %transfer.id,
            source = %transfer.source_warehouse_id,
            destination = %transfer.destination_warehouse_id,
            units = transfer.total_units(),
            "Transfer created"
        );
        Ok(transfer)
    }

    /// Advances a transfer through the state machine, applying the
    /// inventory side-effect of the transition.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        transfer_id: Uuid,
        new_status: TransferStatus,
    ) -> Result<InventoryTransfer, ServiceError> {
        let mut transfer = self
            .repo
            .get(transfer_id)
            .await?
            .ok_or(ServiceError::TransferNotFound(transfer_id))?;

        let old_status = transfer.status;
        if !old_status.can_transition(new_status) {
            TRANSFER_FAILURES.inc();
            return Err(ServiceError::InvalidTransition {
                from: old_status,
                to: new_status,
            });
        }

        match new_status {
            TransferStatus::InTransit => {
                // Idempotent: re-marking keeps the original ship date.
                if transfer.shipment_date.is_none() {
                    transfer.shipment_date = Some(Utc::now());
                }
            }
            TransferStatus::Received => {
                self.inventory
                    .commit_transfer(
                        transfer.source_warehouse_id,
                        transfer.destination_warehouse_id,
                        &transfer.items,
                    )
                    .await?;
                transfer.actual_delivery = Some(Utc::now());
            }
            TransferStatus::Cancelled => {
                self.inventory
                    .release_outbound(transfer.source_warehouse_id, &transfer.items)
                    .await?;
            }
            TransferStatus::Pending => unreachable!("no transition leads back to pending"),
        }

        transfer.status = new_status;
        self.repo.upsert(transfer.clone()).await?;

        self.event_sender
            .send(Event::TransferStatusChanged {
                transfer_id,
                old_status,
                new_status,
            })
            .await
            .map_err(ServiceError::Event)?;

        info!(
            transfer_id = %transfer_id,
            old_status = %old_status,
            new_status = %new_status,
            "Transfer status updated"
        );
        Ok(transfer)
    }

    pub async fn get(&self, transfer_id: Uuid) -> Result<InventoryTransfer, ServiceError> {
        self.repo
            .get(transfer_id)
            .await?
            .ok_or(ServiceError::TransferNotFound(transfer_id))
    }

    /// Transfers where the warehouse is either the source or the
    /// destination.
    pub async fn transfers_for_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<InventoryTransfer>, ServiceError> {
        Ok(self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|t| t.involves(warehouse_id))
            .collect())
    }

    /// Transfers still in flight: `Pending` or `InTransit`.
    pub async fn pending_transfers(&self) -> Result<Vec<InventoryTransfer>, ServiceError> {
        Ok(self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|t| !t.status.is_terminal())
            .collect())
    }

    async fn require_warehouse(&self, warehouse_id: Uuid) -> Result<(), ServiceError> {
        match self.warehouse_repo.get(warehouse_id).await? {
            Some(_) => Ok(()),
            None => {
                TRANSFER_FAILURES.inc();
                Err(ServiceError::WarehouseNotFound(warehouse_id))
            }
        }
    }
}
