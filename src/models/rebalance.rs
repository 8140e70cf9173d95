use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transfer::InventoryTransfer;

/// A batch of draft transfers proposed to flatten stock imbalance.
///
/// Drafts are not executed by the planner; each one must be submitted to
/// the transfer service by the operator or automation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingPlan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub transfers: Vec<InventoryTransfer>,
    pub estimated_total_cost: f64,
    pub expected_improvement_pct: f64,
    pub reason: String,
}

impl RebalancingPlan {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}
