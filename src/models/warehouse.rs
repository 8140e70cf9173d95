use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Postal address of a warehouse; coordinates are optional because not
/// every address has been geocoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub coordinates: Option<GeoPoint>,
}

/// Storage capacity in slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub total_slots: i32,
    pub used_slots: i32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WarehouseType {
    Primary,
    Secondary,
    Regional,
    PopUp,
}

/// A physical warehouse in the fulfillment network.
///
/// Warehouses referenced by inventory are soft-deactivated rather than
/// deleted; `active` gates eligibility for allocation and rebalancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    /// Unique short code, compared case-insensitively.
    pub code: String,
    pub name: String,
    pub warehouse_type: WarehouseType,
    pub address: Address,
    pub capacity: Capacity,
    pub operating_hours: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn coordinates(&self) -> Option<GeoPoint> {
        self.address.coordinates
    }
}

/// Per-product quantity stored at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStock {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A storage slot inside a warehouse, identified by its
/// (zone, aisle, shelf, bin) tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseLocation {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub zone: String,
    pub aisle: u16,
    pub shelf: u16,
    pub bin: u16,
    /// Human-readable slot barcode, derived from the warehouse code and
    /// the slot tuple at creation time.
    pub barcode: String,
    pub items: Vec<LocationStock>,
    pub created_at: DateTime<Utc>,
}

impl WarehouseLocation {
    pub fn new(
        warehouse_id: Uuid,
        warehouse_code: &str,
        zone: impl Into<String>,
        aisle: u16,
        shelf: u16,
        bin: u16,
    ) -> Self {
        let zone = zone.into();
        let barcode = derive_barcode(warehouse_code, &zone, aisle, shelf, bin);
        Self {
            id: Uuid::new_v4(),
            warehouse_id,
            zone,
            aisle,
            shelf,
            bin,
            barcode,
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// The uniqueness key of this slot within its warehouse.
    pub fn slot_key(&self) -> (String, u16, u16, u16) {
        (self.zone.clone(), self.aisle, self.shelf, self.bin)
    }

    /// Quantity of a product currently stored at this slot.
    pub fn quantity_of(&self, product_id: Uuid) -> i32 {
        self.items
            .iter()
            .find(|s| s.product_id == product_id)
            .map(|s| s.quantity)
            .unwrap_or(0)
    }

    /// Adds to (or inserts) the stored quantity for a product. Entries
    /// that reach zero are dropped from the item list.
    pub fn adjust_item(&mut self, product_id: Uuid, delta: i32) {
        match self.items.iter_mut().find(|s| s.product_id == product_id) {
            Some(stock) => stock.quantity += delta,
            None => self.items.push(LocationStock {
                product_id,
                quantity: delta,
            }),
        }
        self.items.retain(|s| s.quantity != 0);
    }
}

fn derive_barcode(warehouse_code: &str, zone: &str, aisle: u16, shelf: u16, bin: u16) -> String {
    format!("{}-{}{:02}{:02}{:02}", warehouse_code, zone, aisle, shelf, bin)
}
