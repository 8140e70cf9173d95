//! Order allocation engine.
//!
//! A pure query over the warehouse set and the inventory ledger: nothing
//! is reserved here. Callers commit reservations against the ledger once
//! they accept a result, re-checking availability under the row locks
//! because a result may be stale by then.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{AllocationWeights, ShippingRateCard};
use crate::errors::ServiceError;
use crate::models::allocation::{
    AllocatedItem, AllocationAlgorithm, AllocationResult, AllocationStatus, UnallocatedItem,
    WarehouseAllocation,
};
use crate::models::inventory::InventoryLevel;
use crate::models::order::Order;
use crate::models::warehouse::{GeoPoint, Warehouse};
use crate::repositories::InventoryRepository;
use crate::services::shipping::{estimate_delivery_days, estimate_shipping_cost, haversine_km};

/// Delivery estimate used when a lane has no distance information.
const UNKNOWN_LANE_DELIVERY_DAYS: u32 = 7;

/// Normalisation constants for the hybrid score.
const HYBRID_DISTANCE_SCALE_KM: f64 = 1000.0;
const HYBRID_INVENTORY_SCALE: f64 = 10_000.0;
const HYBRID_COST_SCALE: f64 = 5000.0;

/// One warehouse under consideration, with the stock snapshot relevant to
/// the order being allocated.
struct Candidate {
    warehouse: Warehouse,
    distance_km: Option<f64>,
    levels: HashMap<Uuid, InventoryLevel>,
}

impl Candidate {
    fn available(&self, product_id: Uuid) -> i32 {
        self.levels
            .get(&product_id)
            .map(|l| l.available)
            .unwrap_or(0)
    }

    fn total_available(&self, demand: &[(Uuid, i32)]) -> i32 {
        demand.iter().map(|(p, _)| self.available(*p)).sum()
    }

    fn can_fulfill(&self, demand: &[(Uuid, i32)]) -> bool {
        demand.iter().all(|(p, q)| self.available(*p) >= *q)
    }

    fn order_cost(&self, rates: &ShippingRateCard, total_units: i32) -> f64 {
        match self.distance_km {
            Some(d) => estimate_shipping_cost(rates, d, total_units),
            None => rates.base + f64::from(total_units) * rates.per_unit,
        }
    }

    fn delivery_days(&self) -> u32 {
        self.distance_km
            .map(estimate_delivery_days)
            .unwrap_or(UNKNOWN_LANE_DELIVERY_DAYS)
    }

    fn hybrid_score(
        &self,
        weights: &AllocationWeights,
        rates: &ShippingRateCard,
        demand: &[(Uuid, i32)],
        total_units: i32,
    ) -> f64 {
        let distance = self.distance_km.unwrap_or(HYBRID_DISTANCE_SCALE_KM);
        let distance_score = 1.0 - (distance / HYBRID_DISTANCE_SCALE_KM).min(1.0);
        let inventory_score = f64::from(self.total_available(demand)) / HYBRID_INVENTORY_SCALE;
        let cost_score = 1.0 - (self.order_cost(rates, total_units) / HYBRID_COST_SCALE).min(1.0);
        distance_score * weights.distance
            + inventory_score * weights.inventory
            + cost_score * weights.cost
    }
}

/// Service answering "which warehouse(s) should fulfill this order".
#[derive(Clone)]
pub struct AllocationService {
    inventory_repo: Arc<dyn InventoryRepository>,
    rates: ShippingRateCard,
}

impl AllocationService {
    pub fn new(inventory_repo: Arc<dyn InventoryRepository>) -> Self {
        Self {
            inventory_repo,
            rates: ShippingRateCard::default(),
        }
    }

    pub fn with_rates(inventory_repo: Arc<dyn InventoryRepository>, rates: ShippingRateCard) -> Self {
        Self {
            inventory_repo,
            rates,
        }
    }

    /// Allocates an order across the given warehouses.
    ///
    /// Every algorithm first attempts to fulfill the whole order from its
    /// top-ranked warehouse, then falls back to a greedy per-item walk of
    /// the ranking. `Full` means zero shortfall regardless of how many
    /// warehouses participate; `Partial` is reserved for genuine
    /// shortfalls and `Failed` for allocating nothing at all.
    #[instrument(skip(self, order, warehouses), fields(order_id = %order.id, algorithm = %algorithm))]
    pub async fn allocate(
        &self,
        order: &Order,
        warehouses: &[Warehouse],
        algorithm: AllocationAlgorithm,
        weights: Option<AllocationWeights>,
    ) -> Result<AllocationResult, ServiceError> {
        let customer = order.customer_location;
        if algorithm.requires_location() && customer.is_none() {
            return Err(ServiceError::MissingCustomerLocation {
                algorithm: algorithm.to_string(),
            });
        }

        let demand = aggregate_demand(order);
        let total_units: i32 = demand.iter().map(|(_, q)| q).sum();
        let weights = weights.unwrap_or_default();

        let mut candidates = self
            .snapshot_candidates(&demand, warehouses, algorithm, customer)
            .await?;
        rank_candidates(
            &mut candidates,
            algorithm,
            &weights,
            &self.rates,
            &demand,
            total_units,
        );

        // Full single-warehouse fulfillment from the top-ranked candidate;
        // the inventory algorithm is per-item by design and skips this.
        if algorithm != AllocationAlgorithm::Inventory {
            if let Some(best) = candidates.first() {
                if best.can_fulfill(&demand) {
                    let result = self.single_warehouse_result(order, best, &demand);
                    info!(warehouse_id = %best.warehouse.id, "Order fully allocated from one warehouse");
                    return Ok(result);
                }
            }
        }

        Ok(self.greedy_result(order, &candidates, algorithm, &demand))
    }

    /// The highest-priority warehouse for the order, or `None` when the
    /// allocation produced nothing.
    pub async fn optimal_warehouse(
        &self,
        order: &Order,
        warehouses: &[Warehouse],
        algorithm: AllocationAlgorithm,
        weights: Option<AllocationWeights>,
    ) -> Result<Option<Uuid>, ServiceError> {
        let result = self.allocate(order, warehouses, algorithm, weights).await?;
        Ok(result.allocations.first().map(|a| a.warehouse_id))
    }

    async fn snapshot_candidates(
        &self,
        demand: &[(Uuid, i32)],
        warehouses: &[Warehouse],
        algorithm: AllocationAlgorithm,
        customer: Option<GeoPoint>,
    ) -> Result<Vec<Candidate>, ServiceError> {
        let mut candidates = Vec::new();
        for warehouse in warehouses.iter().filter(|w| w.active) {
            let coordinates = warehouse.coordinates();
            if algorithm.requires_location() && coordinates.is_none() {
                continue;
            }
            let mut levels = HashMap::new();
            for (product_id, _) in demand {
                if let Some(level) = self
                    .inventory_repo
                    .get_level(*product_id, warehouse.id)
                    .await?
                {
                    levels.insert(*product_id, level);
                }
            }
            let distance_km = match (customer, coordinates) {
                (Some(c), Some(g)) => Some(haversine_km(g, c)),
                _ => None,
            };
            candidates.push(Candidate {
                warehouse: warehouse.clone(),
                distance_km,
                levels,
            });
        }
        Ok(candidates)
    }

    fn single_warehouse_result(
        &self,
        order: &Order,
        candidate: &Candidate,
        demand: &[(Uuid, i32)],
    ) -> AllocationResult {
        let items = demand
            .iter()
            .map(|(product_id, quantity)| AllocatedItem {
                product_id: *product_id,
                quantity: *quantity,
                source_location_ids: candidate
                    .levels
                    .get(product_id)
                    .map(|l| l.source_locations(*quantity))
                    .unwrap_or_default(),
            })
            .collect();
        let total_units = demand.iter().map(|(_, q)| q).sum();
        AllocationResult {
            order_id: order.id,
            allocations: vec![WarehouseAllocation {
                warehouse_id: candidate.warehouse.id,
                warehouse_name: candidate.warehouse.name.clone(),
                items,
                estimated_shipping_cost: candidate.order_cost(&self.rates, total_units),
                estimated_delivery_days: candidate.delivery_days(),
                distance_km: candidate.distance_km,
            }],
            status: AllocationStatus::Full,
            unallocated: Vec::new(),
        }
    }

    /// Greedy per-item fallback: walk the ranked candidates and draw
    /// available stock until each item is covered or candidates run out.
    fn greedy_result(
        &self,
        order: &Order,
        candidates: &[Candidate],
        algorithm: AllocationAlgorithm,
        demand: &[(Uuid, i32)],
    ) -> AllocationResult {
        // Per-warehouse accumulation, in first-use order so the ranking's
        // priority is preserved in the result.
        let mut allocations: Vec<(usize, Vec<AllocatedItem>)> = Vec::new();
        let mut unallocated = Vec::new();

        for (product_id, requested) in demand {
            let mut order_of_walk: Vec<usize> = (0..candidates.len()).collect();
            if algorithm == AllocationAlgorithm::Inventory {
                // Deepest stock first, per item.
                order_of_walk.sort_by_key(|&i| std::cmp::Reverse(candidates[i].available(*product_id)));
            }

            let mut remaining = *requested;
            for index in order_of_walk {
                if remaining <= 0 {
                    break;
                }
                let candidate = &candidates[index];
                let available = candidate.available(*product_id);
                if available <= 0 {
                    continue;
                }
                let take = remaining.min(available);
                let sources = candidate
                    .levels
                    .get(product_id)
                    .map(|l| l.source_locations(take))
                    .unwrap_or_default();
                let position = match allocations.iter().position(|(i, _)| *i == index) {
                    Some(position) => position,
                    None => {
                        allocations.push((index, Vec::new()));
                        allocations.len() - 1
                    }
                };
                allocations[position].1.push(AllocatedItem {
                    product_id: *product_id,
                    quantity: take,
                    source_location_ids: sources,
                });
                remaining -= take;
            }

            if remaining > 0 {
                unallocated.push(UnallocatedItem {
                    product_id: *product_id,
                    requested: *requested,
                    allocated: *requested - remaining,
                    shortfall: remaining,
                });
            }
        }

        let warehouse_allocations: Vec<WarehouseAllocation> = allocations
            .into_iter()
            .map(|(index, items)| {
                let candidate = &candidates[index];
                let units: i32 = items.iter().map(|i| i.quantity).sum();
                WarehouseAllocation {
                    warehouse_id: candidate.warehouse.id,
                    warehouse_name: candidate.warehouse.name.clone(),
                    items,
                    estimated_shipping_cost: candidate.order_cost(&self.rates, units),
                    estimated_delivery_days: candidate.delivery_days(),
                    distance_km: candidate.distance_km,
                }
            })
            .collect();

        let status = if unallocated.is_empty() {
            AllocationStatus::Full
        } else if warehouse_allocations.is_empty() {
            AllocationStatus::Failed
        } else {
            AllocationStatus::Partial
        };

        AllocationResult {
            order_id: order.id,
            allocations: warehouse_allocations,
            status,
            unallocated,
        }
    }
}

/// Collapses duplicate product lines so availability is never counted
/// twice for the same product.
fn aggregate_demand(order: &Order) -> Vec<(Uuid, i32)> {
    let mut demand: Vec<(Uuid, i32)> = Vec::new();
    for item in &order.items {
        match demand.iter_mut().find(|(p, _)| *p == item.product_id) {
            Some((_, q)) => *q += item.quantity,
            None => demand.push((item.product_id, item.quantity)),
        }
    }
    demand
}

fn rank_candidates(
    candidates: &mut [Candidate],
    algorithm: AllocationAlgorithm,
    weights: &AllocationWeights,
    rates: &ShippingRateCard,
    demand: &[(Uuid, i32)],
    total_units: i32,
) {
    match algorithm {
        AllocationAlgorithm::Nearest => {
            candidates.sort_by(|a, b| cmp_f64(a.distance_km, b.distance_km));
        }
        AllocationAlgorithm::Cost => {
            candidates.sort_by(|a, b| {
                cmp_f64(
                    Some(a.order_cost(rates, total_units)),
                    Some(b.order_cost(rates, total_units)),
                )
            });
        }
        AllocationAlgorithm::Hybrid => {
            candidates.sort_by(|a, b| {
                cmp_f64(
                    Some(b.hybrid_score(weights, rates, demand, total_units)),
                    Some(a.hybrid_score(weights, rates, demand, total_units)),
                )
            });
        }
        AllocationAlgorithm::Inventory => {
            candidates.sort_by_key(|c| std::cmp::Reverse(c.total_available(demand)));
        }
    }
}

fn cmp_f64(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
