//! Stock rebalancing planner.
//!
//! Scans one snapshot of the inventory ledger, finds products unevenly
//! distributed across active warehouses, and drafts transfers to flatten
//! the distribution toward the network mean. Drafts are advisory: each
//! one must be submitted to the transfer service by an operator or an
//! automation layer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{RebalancingConfig, ShippingRateCard};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::inventory::InventoryLevel;
use crate::models::rebalance::RebalancingPlan;
use crate::models::transfer::{
    InventoryTransfer, TransferItem, TransferReason, TransferStatus,
};
use crate::models::warehouse::Warehouse;
use crate::repositories::{InventoryRepository, WarehouseRepository};
use crate::services::shipping::{estimate_shipping_cost, haversine_km};

/// Service generating [`RebalancingPlan`]s.
#[derive(Clone)]
pub struct RebalancingService {
    inventory_repo: Arc<dyn InventoryRepository>,
    warehouse_repo: Arc<dyn WarehouseRepository>,
    event_sender: EventSender,
    config: RebalancingConfig,
    rates: ShippingRateCard,
}

impl RebalancingService {
    pub fn new(
        inventory_repo: Arc<dyn InventoryRepository>,
        warehouse_repo: Arc<dyn WarehouseRepository>,
        event_sender: EventSender,
    ) -> Self {
        Self::with_config(
            inventory_repo,
            warehouse_repo,
            event_sender,
            RebalancingConfig::default(),
            ShippingRateCard::default(),
        )
    }

    pub fn with_config(
        inventory_repo: Arc<dyn InventoryRepository>,
        warehouse_repo: Arc<dyn WarehouseRepository>,
        event_sender: EventSender,
        config: RebalancingConfig,
        rates: ShippingRateCard,
    ) -> Self {
        Self {
            inventory_repo,
            warehouse_repo,
            event_sender,
            config,
            rates,
        }
    }

    /// Generates a plan from the current ledger snapshot.
    ///
    /// A warehouse is excess for a product when its total stock exceeds
    /// `excess_factor * mean`, and deficit when it falls below
    /// `deficit_factor * mean` while carrying a reorder point (no reorder
    /// point means the product is not actively managed there). Proposed
    /// quantities are capped by the excess warehouse's remaining
    /// available stock, tracked across pairs so one source is never
    /// overcommitted within a single plan.
    #[instrument(skip(self))]
    pub async fn generate_plan(&self) -> Result<RebalancingPlan, ServiceError> {
        let active: HashMap<Uuid, Warehouse> = self
            .warehouse_repo
            .list()
            .await?
            .into_iter()
            .filter(|w| w.active)
            .map(|w| (w.id, w))
            .collect();
        let snapshot = self.inventory_repo.list_levels().await?;

        let mut by_product: HashMap<Uuid, Vec<InventoryLevel>> = HashMap::new();
        for level in snapshot {
            if active.contains_key(&level.warehouse_id) {
                by_product.entry(level.product_id).or_default().push(level);
            }
        }

        // Deterministic plan ordering regardless of snapshot iteration
        // order.
        let mut groups: Vec<(Uuid, Vec<InventoryLevel>)> = by_product.into_iter().collect();
        groups.sort_by_key(|(product_id, _)| *product_id);

        let mut transfers = Vec::new();
        for (product_id, mut rows) in groups {
            if rows.len() < 2 {
                continue;
            }
            rows.sort_by_key(|r| r.warehouse_id);
            let mean = rows.iter().map(|r| f64::from(r.total_quantity)).sum::<f64>()
                / rows.len() as f64;

            let excess: Vec<&InventoryLevel> = rows
                .iter()
                .filter(|r| f64::from(r.total_quantity) > self.config.excess_factor * mean)
                .collect();
            let deficit: Vec<&InventoryLevel> = rows
                .iter()
                .filter(|r| {
                    f64::from(r.total_quantity) < self.config.deficit_factor * mean
                        && r.reorder_point.is_some()
                })
                .collect();

            for source in &excess {
                // Remaining spendable stock of this source across the
                // deficit warehouses it gets paired with.
                let mut remaining = source.available;
                let quantity =
                    ((f64::from(source.total_quantity) - mean) / 2.0).floor() as i32;
                if quantity <= 0 {
                    continue;
                }
                for target in &deficit {
                    if remaining < quantity {
                        break;
                    }
                    remaining -= quantity;
                    transfers.push(self.draft_transfer(
                        &active,
                        source.warehouse_id,
                        target.warehouse_id,
                        product_id,
                        quantity,
                    ));
                }
            }
        }

        let estimated_total_cost = transfers
            .iter()
            .map(|t: &InventoryTransfer| t.cost.unwrap_or(self.config.default_transfer_cost))
            .sum();
        let plan = RebalancingPlan {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            transfers,
            estimated_total_cost,
            expected_improvement_pct: self.config.expected_improvement_pct,
            reason: "Flatten per-product stock distribution toward the network mean".to_string(),
        };

        self.event_sender
            .send(Event::RebalancingPlanGenerated {
                plan_id: plan.id,
                transfer_count: plan.transfers.len(),
            })
            .await
            .map_err(ServiceError::Event)?;
        info!(
            plan_id = %plan.id,
            transfer_count = plan.transfers.len(),
            estimated_total_cost = plan.estimated_total_cost,
            "Rebalancing plan generated"
        );
        Ok(plan)
    }

    fn draft_transfer(
        &self,
        warehouses: &HashMap<Uuid, Warehouse>,
        source_warehouse_id: Uuid,
        destination_warehouse_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> InventoryTransfer {
        let cost = match (
            warehouses
                .get(&source_warehouse_id)
                .and_then(|w| w.coordinates()),
            warehouses
                .get(&destination_warehouse_id)
                .and_then(|w| w.coordinates()),
        ) {
            (Some(from), Some(to)) => Some(estimate_shipping_cost(
                &self.rates,
                haversine_km(from, to),
                quantity,
            )),
            _ => None,
        };

        InventoryTransfer {
            id: Uuid::new_v4(),
            source_warehouse_id,
            destination_warehouse_id,
            items: vec![TransferItem {
                product_id,
                quantity,
            }],
            status: TransferStatus::Pending,
            reason: TransferReason::Rebalancing,
            initiated_at: Utc::now(),
            shipment_date: None,
            estimated_delivery: None,
            actual_delivery: None,
            cost,
            notes: None,
        }
    }
}
