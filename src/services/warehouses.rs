//! Warehouse registry: registration, updates, soft deactivation, the
//! delete cascade, and storage-location management.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::warehouse::{
    Address, Capacity, Warehouse, WarehouseLocation, WarehouseType,
};
use crate::repositories::{InventoryRepository, WarehouseRepository};

/// Input for registering a warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewWarehouse {
    #[validate(length(min = 1, message = "Warehouse code cannot be empty"))]
    pub code: String,
    #[validate(length(min = 1, message = "Warehouse name cannot be empty"))]
    pub name: String,
    pub warehouse_type: WarehouseType,
    pub address: Address,
    pub capacity: Capacity,
    pub operating_hours: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub warehouse_type: Option<WarehouseType>,
    pub address: Option<Address>,
    pub capacity: Option<Capacity>,
    pub operating_hours: Option<Option<String>>,
}

/// Input for adding a storage location to a warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewLocation {
    #[validate(length(min = 1, max = 2, message = "Zone must be 1-2 characters"))]
    pub zone: String,
    pub aisle: u16,
    pub shelf: u16,
    pub bin: u16,
}

/// Service managing [`Warehouse`] and [`WarehouseLocation`] records.
#[derive(Clone)]
pub struct WarehouseService {
    repo: Arc<dyn WarehouseRepository>,
    inventory_repo: Arc<dyn InventoryRepository>,
    event_sender: EventSender,
}

impl WarehouseService {
    pub fn new(
        repo: Arc<dyn WarehouseRepository>,
        inventory_repo: Arc<dyn InventoryRepository>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            repo,
            inventory_repo,
            event_sender,
        }
    }

    /// Registers a new warehouse. Codes are unique case-insensitively.
    #[instrument(skip(self, new))]
    pub async fn register(&self, new: NewWarehouse) -> Result<Warehouse, ServiceError> {
        new.validate().map_err(ServiceError::validation)?;
        if let Some(existing) = self.repo.get_by_code(&new.code).await? {
            warn!(code = %new.code, existing_id = %existing.id, "Duplicate warehouse code");
            return Err(ServiceError::DuplicateCode(new.code));
        }

        let now = Utc::now();
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            code: new.code,
            name: new.name,
            warehouse_type: new.warehouse_type,
            address: new.address,
            capacity: new.capacity,
            operating_hours: new.operating_hours,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.upsert(warehouse.clone()).await?;

        self.event_sender
            .send(Event::WarehouseRegistered(warehouse.id))
            .await
            .map_err(ServiceError::Event)?;
        info!(warehouse_id = %warehouse.id, code = %warehouse.code, "Warehouse registered");
        Ok(warehouse)
    }

    pub async fn get(&self, id: Uuid) -> Result<Warehouse, ServiceError> {
        self.repo
            .get(id)
            .await?
            .ok_or(ServiceError::WarehouseNotFound(id))
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<Warehouse>, ServiceError> {
        self.repo.get_by_code(code).await
    }

    /// Applies a partial update. A changed code is re-checked for
    /// uniqueness before anything is written.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        id: Uuid,
        update: WarehouseUpdate,
    ) -> Result<Warehouse, ServiceError> {
        let mut warehouse = self.get(id).await?;

        if let Some(code) = update.code {
            if !code.eq_ignore_ascii_case(&warehouse.code) {
                if self.repo.get_by_code(&code).await?.is_some() {
                    return Err(ServiceError::DuplicateCode(code));
                }
            }
            warehouse.code = code;
        }
        if let Some(name) = update.name {
            warehouse.name = name;
        }
        if let Some(warehouse_type) = update.warehouse_type {
            warehouse.warehouse_type = warehouse_type;
        }
        if let Some(address) = update.address {
            warehouse.address = address;
        }
        if let Some(capacity) = update.capacity {
            warehouse.capacity = capacity;
        }
        if let Some(operating_hours) = update.operating_hours {
            warehouse.operating_hours = operating_hours;
        }
        warehouse.updated_at = Utc::now();
        self.repo.upsert(warehouse.clone()).await?;

        self.event_sender
            .send(Event::WarehouseUpdated(id))
            .await
            .map_err(ServiceError::Event)?;
        Ok(warehouse)
    }

    /// Soft-deactivates a warehouse; inventory referencing it stays put.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<Warehouse, ServiceError> {
        let mut warehouse = self.get(id).await?;
        warehouse.active = false;
        warehouse.updated_at = Utc::now();
        self.repo.upsert(warehouse.clone()).await?;

        self.event_sender
            .send(Event::WarehouseDeactivated(id))
            .await
            .map_err(ServiceError::Event)?;
        info!(warehouse_id = %id, "Warehouse deactivated");
        Ok(warehouse)
    }

    /// Hard-deletes a warehouse after purging its locations and inventory
    /// rows. The existence check runs before any step mutates, and each
    /// purge step aborts the whole operation on failure.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let locations = self.repo.delete_locations(id).await?;
        let levels = self.inventory_repo.delete_by_warehouse(id).await?;
        if !self.repo.delete(id).await? {
            return Err(ServiceError::WarehouseNotFound(id));
        }

        self.event_sender
            .send(Event::WarehouseDeleted(id))
            .await
            .map_err(ServiceError::Event)?;
        info!(
            warehouse_id = %id,
            purged_locations = locations,
            purged_levels = levels,
            "Warehouse deleted"
        );
        Ok(())
    }

    pub async fn list_active(&self) -> Result<Vec<Warehouse>, ServiceError> {
        Ok(self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|w| w.active)
            .collect())
    }

    pub async fn list_by_type(
        &self,
        warehouse_type: WarehouseType,
    ) -> Result<Vec<Warehouse>, ServiceError> {
        Ok(self
            .repo
            .list()
            .await?
            .into_iter()
            .filter(|w| w.warehouse_type == warehouse_type)
            .collect())
    }

    /// Adds a storage location; the (zone, aisle, shelf, bin) tuple must
    /// be unique within the warehouse.
    #[instrument(skip(self, new))]
    pub async fn add_location(
        &self,
        warehouse_id: Uuid,
        new: NewLocation,
    ) -> Result<WarehouseLocation, ServiceError> {
        new.validate().map_err(ServiceError::validation)?;
        let warehouse = self.get(warehouse_id).await?;

        let slot = (new.zone.clone(), new.aisle, new.shelf, new.bin);
        let taken = self
            .repo
            .list_locations(warehouse_id)
            .await?
            .iter()
            .any(|l| l.slot_key() == slot);
        if taken {
            return Err(ServiceError::DuplicateLocation(format!(
                "{}{:02}{:02}{:02}",
                new.zone, new.aisle, new.shelf, new.bin
            )));
        }

        let location = WarehouseLocation::new(
            warehouse_id,
            &warehouse.code,
            new.zone,
            new.aisle,
            new.shelf,
            new.bin,
        );
        self.repo.upsert_location(location.clone()).await?;
        info!(
            warehouse_id = %warehouse_id,
            location_id = %location.id,
            barcode = %location.barcode,
            "Location added"
        );
        Ok(location)
    }

    pub async fn list_locations(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<WarehouseLocation>, ServiceError> {
        self.repo.list_locations(warehouse_id).await
    }
}
