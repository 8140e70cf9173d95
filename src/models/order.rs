use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::warehouse::GeoPoint;

/// A line item on a customer order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A customer order as supplied by the order-processing collaborator.
///
/// The customer location is optional; distance-aware allocation algorithms
/// reject orders without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub items: Vec<OrderItem>,
    pub customer_location: Option<GeoPoint>,
    /// Priority level, 1-5, higher is more urgent.
    pub priority: u8,
}

impl Order {
    /// Total unit count across all line items; used as the weight proxy in
    /// shipping cost estimates.
    pub fn total_units(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
