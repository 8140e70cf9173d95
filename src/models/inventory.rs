use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quantity of a product held at one warehouse location, as tracked on the
/// ledger row. Must stay in step with the location record's own item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuantity {
    pub location_id: Uuid,
    pub quantity: i32,
}

/// Stock level for one (product, warehouse) pair.
///
/// `available` is derived, never caller-supplied: every write path goes
/// through [`InventoryLevel::recompute_available`] so the invariant
/// `available = total - reserved - in_transit` cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub total_quantity: i32,
    pub reserved: i32,
    pub in_transit: i32,
    pub available: i32,
    pub by_location: Vec<LocationQuantity>,
    pub reorder_point: Option<i32>,
    pub max_stock: Option<i32>,
    pub last_count_date: Option<DateTime<Utc>>,
    /// Bumped on every ledger write; a database-backed repository can use
    /// it as an optimistic-concurrency column.
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryLevel {
    /// An empty ledger row for a pair not yet stocked.
    pub fn empty(product_id: Uuid, warehouse_id: Uuid) -> Self {
        Self {
            product_id,
            warehouse_id,
            total_quantity: 0,
            reserved: 0,
            in_transit: 0,
            available: 0,
            by_location: Vec::new(),
            reorder_point: None,
            max_stock: None,
            last_count_date: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Re-derives `available` from the source quantities.
    pub fn recompute_available(&mut self) {
        self.available = self.total_quantity - self.reserved - self.in_transit;
    }

    /// True when every quantity on the row is non-negative.
    pub fn is_consistent(&self) -> bool {
        self.total_quantity >= 0
            && self.reserved >= 0
            && self.in_transit >= 0
            && self.available >= 0
    }

    /// Adjusts the per-location breakdown, dropping emptied entries.
    pub fn adjust_location(&mut self, location_id: Uuid, delta: i32) {
        match self
            .by_location
            .iter_mut()
            .find(|l| l.location_id == location_id)
        {
            Some(entry) => entry.quantity += delta,
            None => self.by_location.push(LocationQuantity {
                location_id,
                quantity: delta,
            }),
        }
        self.by_location.retain(|l| l.quantity != 0);
    }

    /// Location ids able to supply `quantity` units, in breakdown order.
    /// Returns all contributing locations up to the requested quantity.
    pub fn source_locations(&self, quantity: i32) -> Vec<Uuid> {
        let mut remaining = quantity;
        let mut sources = Vec::new();
        for entry in &self.by_location {
            if remaining <= 0 {
                break;
            }
            sources.push(entry.location_id);
            remaining -= entry.quantity;
        }
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_total_minus_reserved_minus_in_transit() {
        let mut level = InventoryLevel::empty(Uuid::new_v4(), Uuid::new_v4());
        level.total_quantity = 100;
        level.reserved = 15;
        level.in_transit = 25;
        level.recompute_available();
        assert_eq!(level.available, 60);
        assert!(level.is_consistent());
    }

    #[test]
    fn source_locations_stop_once_quantity_is_covered() {
        let mut level = InventoryLevel::empty(Uuid::new_v4(), Uuid::new_v4());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        level.adjust_location(a, 5);
        level.adjust_location(b, 10);
        level.adjust_location(c, 50);
        assert_eq!(level.source_locations(12), vec![a, b]);
        assert_eq!(level.source_locations(20), vec![a, b, c]);
    }
}
