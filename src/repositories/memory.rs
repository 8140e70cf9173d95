//! DashMap-backed in-memory repositories.
//!
//! These back the test suites and serve as the default wiring when no
//! durable store is injected.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::inventory::InventoryLevel;
use crate::models::transfer::InventoryTransfer;
use crate::models::warehouse::{Warehouse, WarehouseLocation};

use super::{InventoryRepository, TransferRepository, WarehouseRepository};

#[derive(Default)]
pub struct InMemoryWarehouseRepository {
    warehouses: DashMap<Uuid, Warehouse>,
    locations: DashMap<Uuid, WarehouseLocation>,
}

impl InMemoryWarehouseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WarehouseRepository for InMemoryWarehouseRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Warehouse>, ServiceError> {
        Ok(self.warehouses.get(&id).map(|w| w.clone()))
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Warehouse>, ServiceError> {
        Ok(self
            .warehouses
            .iter()
            .find(|w| w.code.eq_ignore_ascii_case(code))
            .map(|w| w.clone()))
    }

    async fn list(&self) -> Result<Vec<Warehouse>, ServiceError> {
        Ok(self.warehouses.iter().map(|w| w.clone()).collect())
    }

    async fn upsert(&self, warehouse: Warehouse) -> Result<(), ServiceError> {
        self.warehouses.insert(warehouse.id, warehouse);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.warehouses.remove(&id).is_some())
    }

    async fn get_location(&self, id: Uuid) -> Result<Option<WarehouseLocation>, ServiceError> {
        Ok(self.locations.get(&id).map(|l| l.clone()))
    }

    async fn list_locations(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<WarehouseLocation>, ServiceError> {
        Ok(self
            .locations
            .iter()
            .filter(|l| l.warehouse_id == warehouse_id)
            .map(|l| l.clone())
            .collect())
    }

    async fn upsert_location(&self, location: WarehouseLocation) -> Result<(), ServiceError> {
        self.locations.insert(location.id, location);
        Ok(())
    }

    async fn delete_locations(&self, warehouse_id: Uuid) -> Result<usize, ServiceError> {
        let ids: Vec<Uuid> = self
            .locations
            .iter()
            .filter(|l| l.warehouse_id == warehouse_id)
            .map(|l| l.id)
            .collect();
        for id in &ids {
            self.locations.remove(id);
        }
        Ok(ids.len())
    }
}

#[derive(Default)]
pub struct InMemoryInventoryRepository {
    levels: DashMap<(Uuid, Uuid), InventoryLevel>,
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn get_level(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<InventoryLevel>, ServiceError> {
        Ok(self
            .levels
            .get(&(product_id, warehouse_id))
            .map(|l| l.clone()))
    }

    async fn list_levels(&self) -> Result<Vec<InventoryLevel>, ServiceError> {
        Ok(self.levels.iter().map(|l| l.clone()).collect())
    }

    async fn list_by_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<InventoryLevel>, ServiceError> {
        Ok(self
            .levels
            .iter()
            .filter(|l| l.warehouse_id == warehouse_id)
            .map(|l| l.clone())
            .collect())
    }

    async fn list_by_product(&self, product_id: Uuid) -> Result<Vec<InventoryLevel>, ServiceError> {
        Ok(self
            .levels
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.clone())
            .collect())
    }

    async fn upsert_level(&self, level: InventoryLevel) -> Result<(), ServiceError> {
        self.levels
            .insert((level.product_id, level.warehouse_id), level);
        Ok(())
    }

    async fn delete_by_warehouse(&self, warehouse_id: Uuid) -> Result<usize, ServiceError> {
        let keys: Vec<(Uuid, Uuid)> = self
            .levels
            .iter()
            .filter(|l| l.warehouse_id == warehouse_id)
            .map(|l| (l.product_id, l.warehouse_id))
            .collect();
        for key in &keys {
            self.levels.remove(key);
        }
        Ok(keys.len())
    }
}

#[derive(Default)]
pub struct InMemoryTransferRepository {
    transfers: DashMap<Uuid, InventoryTransfer>,
}

impl InMemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn get(&self, id: Uuid) -> Result<Option<InventoryTransfer>, ServiceError> {
        Ok(self.transfers.get(&id).map(|t| t.clone()))
    }

    async fn list(&self) -> Result<Vec<InventoryTransfer>, ServiceError> {
        Ok(self.transfers.iter().map(|t| t.clone()).collect())
    }

    async fn upsert(&self, transfer: InventoryTransfer) -> Result<(), ServiceError> {
        self.transfers.insert(transfer.id, transfer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::warehouse::{Address, Capacity, WarehouseType};
    use chrono::Utc;

    fn warehouse(code: &str) -> Warehouse {
        Warehouse {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("Warehouse {}", code),
            warehouse_type: WarehouseType::Primary,
            address: Address {
                street: "1 Dock Rd".into(),
                city: "Bangkok".into(),
                state: "BKK".into(),
                country: "TH".into(),
                postal_code: "10100".into(),
                coordinates: None,
            },
            capacity: Capacity::default(),
            operating_hours: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn code_lookup_ignores_case() {
        let repo = InMemoryWarehouseRepository::new();
        repo.upsert(warehouse("BKK1")).await.unwrap();
        assert!(repo.get_by_code("bkk1").await.unwrap().is_some());
        assert!(repo.get_by_code("BKK1").await.unwrap().is_some());
        assert!(repo.get_by_code("BKK2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_by_warehouse_removes_only_matching_rows() {
        let repo = InMemoryInventoryRepository::new();
        let (w1, w2, p) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        repo.upsert_level(InventoryLevel::empty(p, w1)).await.unwrap();
        repo.upsert_level(InventoryLevel::empty(p, w2)).await.unwrap();
        assert_eq!(repo.delete_by_warehouse(w1).await.unwrap(), 1);
        assert!(repo.get_level(p, w1).await.unwrap().is_none());
        assert!(repo.get_level(p, w2).await.unwrap().is_some());
    }
}
