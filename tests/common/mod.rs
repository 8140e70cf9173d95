//! Shared fixtures for the integration suites.

use fulfillment_core::models::warehouse::{
    Address, Capacity, GeoPoint, Warehouse, WarehouseType,
};
use fulfillment_core::services::warehouses::NewWarehouse;
use fulfillment_core::Core;
use uuid::Uuid;

/// A wired core over in-memory repositories, with its event channel
/// drained in the background.
pub fn core() -> Core {
    let (core, rx) = Core::in_memory(256);
    tokio::spawn(fulfillment_core::events::process_events(rx));
    core
}

pub fn new_warehouse(code: &str, coordinates: Option<GeoPoint>) -> NewWarehouse {
    NewWarehouse {
        code: code.to_string(),
        name: format!("Warehouse {}", code),
        warehouse_type: WarehouseType::Regional,
        address: Address {
            street: "1 Dock Rd".into(),
            city: "Bangkok".into(),
            state: "BKK".into(),
            country: "TH".into(),
            postal_code: "10100".into(),
            coordinates,
        },
        capacity: Capacity {
            total_slots: 1000,
            used_slots: 0,
        },
        operating_hours: None,
    }
}

/// Registers a warehouse and seeds it with stock of a product.
pub async fn stocked_warehouse(
    core: &Core,
    code: &str,
    coordinates: Option<GeoPoint>,
    product: Uuid,
    quantity: i32,
) -> Warehouse {
    let warehouse = core
        .warehouses
        .register(new_warehouse(code, coordinates))
        .await
        .expect("register warehouse");
    if quantity > 0 {
        core.inventory
            .receive_stock(product, warehouse.id, quantity, None)
            .await
            .expect("seed stock");
    }
    warehouse
}

/// Roughly `km` kilometres due north of the reference point.
pub fn north_of(origin: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint {
        latitude: origin.latitude + km / 111.0,
        longitude: origin.longitude,
    }
}

pub const BANGKOK: GeoPoint = GeoPoint {
    latitude: 13.7563,
    longitude: 100.5018,
};
