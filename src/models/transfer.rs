use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle states of an inter-warehouse transfer.
///
/// Legal moves: `Pending -> InTransit -> Received` and
/// `Pending | InTransit -> Cancelled`. `Received` and `Cancelled` are
/// terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InTransit,
    Received,
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Received | TransferStatus::Cancelled)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, InTransit) | (InTransit, Received) | (Pending, Cancelled) | (InTransit, Cancelled)
        )
    }
}

/// Why a transfer was raised.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferReason {
    Rebalancing,
    DemandForecast,
    Consolidation,
    Manual,
}

/// A line item on a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Movement of stock between two warehouses, tracked through the
/// [`TransferStatus`] state machine. Inventory side-effects are applied by
/// the transfer service on creation and on each transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryTransfer {
    pub id: Uuid,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub items: Vec<TransferItem>,
    pub status: TransferStatus,
    pub reason: TransferReason,
    pub initiated_at: DateTime<Utc>,
    pub shipment_date: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
}

impl InventoryTransfer {
    /// Whether the given warehouse is either end of this transfer.
    pub fn involves(&self, warehouse_id: Uuid) -> bool {
        self.source_warehouse_id == warehouse_id || self.destination_warehouse_id == warehouse_id
    }

    /// Total units moved by this transfer.
    pub fn total_units(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
