//! Persistence contracts consumed by the services.
//!
//! The core defines the record shapes and the read/write operations it
//! needs; the backing store is the persistence collaborator's choice. The
//! [`memory`] module provides DashMap-backed implementations used by tests
//! and as a default wiring.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::inventory::InventoryLevel;
use crate::models::transfer::InventoryTransfer;
use crate::models::warehouse::{Warehouse, WarehouseLocation};

pub mod memory;

/// Storage for warehouses and their locations.
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Warehouse>, ServiceError>;
    /// Code lookup is case-insensitive.
    async fn get_by_code(&self, code: &str) -> Result<Option<Warehouse>, ServiceError>;
    async fn list(&self) -> Result<Vec<Warehouse>, ServiceError>;
    async fn upsert(&self, warehouse: Warehouse) -> Result<(), ServiceError>;
    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError>;

    async fn get_location(&self, id: Uuid) -> Result<Option<WarehouseLocation>, ServiceError>;
    async fn list_locations(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<WarehouseLocation>, ServiceError>;
    async fn upsert_location(&self, location: WarehouseLocation) -> Result<(), ServiceError>;
    /// Removes every location of a warehouse, returning how many were
    /// deleted.
    async fn delete_locations(&self, warehouse_id: Uuid) -> Result<usize, ServiceError>;
}

/// Storage for per-(product, warehouse) stock levels.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn get_level(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<InventoryLevel>, ServiceError>;
    /// Point-in-time snapshot of every ledger row; the rebalancing planner
    /// scans it exactly once per plan.
    async fn list_levels(&self) -> Result<Vec<InventoryLevel>, ServiceError>;
    async fn list_by_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<InventoryLevel>, ServiceError>;
    async fn list_by_product(&self, product_id: Uuid) -> Result<Vec<InventoryLevel>, ServiceError>;
    async fn upsert_level(&self, level: InventoryLevel) -> Result<(), ServiceError>;
    async fn delete_by_warehouse(&self, warehouse_id: Uuid) -> Result<usize, ServiceError>;
}

/// Storage for inter-warehouse transfers.
#[async_trait]
pub trait TransferRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<InventoryTransfer>, ServiceError>;
    async fn list(&self) -> Result<Vec<InventoryTransfer>, ServiceError>;
    async fn upsert(&self, transfer: InventoryTransfer) -> Result<(), ServiceError>;
}
