use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Warehouse-selection strategies supported by the allocation engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AllocationAlgorithm {
    /// Closest warehouse able to fulfill the whole order.
    Nearest,
    /// Per-item deepest available stock; ignores distance.
    Inventory,
    /// Cheapest estimated shipping cost.
    Cost,
    /// Weighted blend of distance, inventory depth and cost.
    Hybrid,
}

impl AllocationAlgorithm {
    /// Whether this algorithm needs the customer's coordinates.
    pub fn requires_location(self) -> bool {
        !matches!(self, AllocationAlgorithm::Inventory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AllocationStatus {
    /// Every item fully placed, possibly across several warehouses.
    Full,
    /// At least one item carries a genuine shortfall.
    Partial,
    /// Nothing could be allocated anywhere.
    Failed,
}

/// One item's share of an allocation at a particular warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatedItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Ledger locations the quantity would be picked from.
    pub source_location_ids: Vec<Uuid>,
}

/// Everything drawn from a single warehouse for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseAllocation {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub items: Vec<AllocatedItem>,
    pub estimated_shipping_cost: f64,
    pub estimated_delivery_days: u32,
    /// Great-circle distance to the customer, when both ends have
    /// coordinates.
    pub distance_km: Option<f64>,
}

/// Requested-versus-allocated detail for items that could not be fully
/// placed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnallocatedItem {
    pub product_id: Uuid,
    pub requested: i32,
    pub allocated: i32,
    pub shortfall: i32,
}

/// Outcome of an allocation query. Purely advisory: nothing is reserved
/// until the caller commits against the inventory ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub order_id: Uuid,
    pub allocations: Vec<WarehouseAllocation>,
    pub status: AllocationStatus,
    pub unallocated: Vec<UnallocatedItem>,
}

impl AllocationResult {
    /// Total units placed across all warehouses.
    pub fn total_allocated(&self) -> i32 {
        self.allocations
            .iter()
            .flat_map(|a| a.items.iter())
            .map(|i| i.quantity)
            .sum()
    }
}
