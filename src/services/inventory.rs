//! The inventory ledger.
//!
//! Every stock mutation in the crate funnels through this service so the
//! derived `available = total - reserved - in_transit` quantity is
//! recomputed on a single write path and can never be bypassed. Each
//! (product, warehouse) row is guarded by an async mutex from a shared
//! lock table; multi-row operations take their locks in sorted key order.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::inventory::InventoryLevel;
use crate::models::transfer::TransferItem;
use crate::repositories::{InventoryRepository, WarehouseRepository};

type RowKey = (Uuid, Uuid);

/// Service owning reads and writes of [`InventoryLevel`] rows.
#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<dyn InventoryRepository>,
    warehouse_repo: Arc<dyn WarehouseRepository>,
    event_sender: EventSender,
    locks: Arc<DashMap<RowKey, Arc<Mutex<()>>>>,
}

impl InventoryService {
    pub fn new(
        repo: Arc<dyn InventoryRepository>,
        warehouse_repo: Arc<dyn WarehouseRepository>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            repo,
            warehouse_repo,
            event_sender,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn row_lock(&self, key: RowKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn acquire(&self, key: RowKey) -> OwnedMutexGuard<()> {
        self.row_lock(key).lock_owned().await
    }

    /// Acquires locks for several rows in sorted key order, so concurrent
    /// multi-row operations cannot deadlock.
    async fn acquire_all(&self, mut keys: Vec<RowKey>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }

    async fn load_or_empty(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<InventoryLevel, ServiceError> {
        Ok(self
            .repo
            .get_level(product_id, warehouse_id)
            .await?
            .unwrap_or_else(|| InventoryLevel::empty(product_id, warehouse_id)))
    }

    /// Persists a mutated row, recomputing the derived quantity and
    /// bumping the optimistic version. Must be called with the row lock
    /// held.
    async fn store(&self, mut level: InventoryLevel) -> Result<InventoryLevel, ServiceError> {
        level.recompute_available();
        debug_assert!(level.is_consistent(), "ledger write would go negative");
        level.version += 1;
        level.updated_at = Utc::now();
        self.repo.upsert_level(level.clone()).await?;
        Ok(level)
    }

    pub async fn get_level(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<InventoryLevel>, ServiceError> {
        self.repo.get_level(product_id, warehouse_id).await
    }

    pub async fn levels_for_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<InventoryLevel>, ServiceError> {
        self.repo.list_by_warehouse(warehouse_id).await
    }

    /// Books new stock into a warehouse, optionally into a specific
    /// location. The location record's item list and the ledger row's
    /// per-location breakdown are updated in the same locked section.
    #[instrument(skip(self))]
    pub async fn receive_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        location_id: Option<Uuid>,
    ) -> Result<InventoryLevel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "Received quantity must be positive".to_string(),
            ));
        }
        self.require_warehouse(warehouse_id).await?;

        let location = match location_id {
            Some(id) => {
                let location = self
                    .warehouse_repo
                    .get_location(id)
                    .await?
                    .ok_or(ServiceError::LocationNotFound(id))?;
                if location.warehouse_id != warehouse_id {
                    return Err(ServiceError::Validation(format!(
                        "Location {} does not belong to warehouse {}",
                        id, warehouse_id
                    )));
                }
                Some(location)
            }
            None => None,
        };

        let _guard = self.acquire((product_id, warehouse_id)).await;

        let mut level = self.load_or_empty(product_id, warehouse_id).await?;
        level.total_quantity += quantity;
        if let Some(mut location) = location {
            level.adjust_location(location.id, quantity);
            location.adjust_item(product_id, quantity);
            self.warehouse_repo.upsert_location(location).await?;
        }
        let level = self.store(level).await?;

        self.event_sender
            .send(Event::InventoryReceived {
                product_id,
                warehouse_id,
                quantity,
            })
            .await
            .map_err(ServiceError::Event)?;

        info!(
            product_id = %product_id,
            warehouse_id = %warehouse_id,
            quantity = quantity,
            total = level.total_quantity,
            "Stock received"
        );
        Ok(level)
    }

    /// Reserves stock for an order; the quantity stays on hand but leaves
    /// the available pool.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "Reserved quantity must be positive".to_string(),
            ));
        }
        let _guard = self.acquire((product_id, warehouse_id)).await;

        let mut level = self.load_or_empty(product_id, warehouse_id).await?;
        if level.available < quantity {
            return Err(ServiceError::InsufficientInventory {
                product_id,
                warehouse_id,
                requested: quantity,
                available: level.available,
            });
        }
        level.reserved += quantity;
        let level = self.store(level).await?;

        self.event_sender
            .send(Event::InventoryReserved {
                product_id,
                warehouse_id,
                quantity,
            })
            .await
            .map_err(ServiceError::Event)?;
        Ok(level)
    }

    /// Returns previously reserved stock to the available pool.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<InventoryLevel, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "Released quantity must be positive".to_string(),
            ));
        }
        let _guard = self.acquire((product_id, warehouse_id)).await;

        let mut level = self.load_or_empty(product_id, warehouse_id).await?;
        if level.reserved < quantity {
            return Err(ServiceError::Validation(format!(
                "Cannot release {} units; only {} reserved",
                quantity, level.reserved
            )));
        }
        level.reserved -= quantity;
        let level = self.store(level).await?;

        self.event_sender
            .send(Event::InventoryReleased {
                product_id,
                warehouse_id,
                quantity,
            })
            .await
            .map_err(ServiceError::Event)?;
        Ok(level)
    }

    /// Stamps the row with a completed cycle count.
    #[instrument(skip(self))]
    pub async fn record_count(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<InventoryLevel, ServiceError> {
        let _guard = self.acquire((product_id, warehouse_id)).await;
        let mut level = self.load_or_empty(product_id, warehouse_id).await?;
        level.last_count_date = Some(Utc::now());
        self.store(level).await
    }

    /// Configures the reorder point and maximum stock for a row. A row is
    /// created if none exists so thresholds can be set ahead of stock.
    #[instrument(skip(self))]
    pub async fn set_stock_limits(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        reorder_point: Option<i32>,
        max_stock: Option<i32>,
    ) -> Result<InventoryLevel, ServiceError> {
        self.require_warehouse(warehouse_id).await?;
        let _guard = self.acquire((product_id, warehouse_id)).await;
        let mut level = self.load_or_empty(product_id, warehouse_id).await?;
        level.reorder_point = reorder_point;
        level.max_stock = max_stock;
        self.store(level).await
    }

    async fn require_warehouse(&self, warehouse_id: Uuid) -> Result<(), ServiceError> {
        self.warehouse_repo
            .get(warehouse_id)
            .await?
            .map(|_| ())
            .ok_or(ServiceError::WarehouseNotFound(warehouse_id))
    }

    // ---- transfer hooks -------------------------------------------------
    //
    // Called by the transfer service while it drives the transfer state
    // machine. Each hook validates every row before mutating any of them,
    // under all row locks, so a failing item leaves the ledger untouched.

    /// Moves `quantity` per item from the source's available pool into
    /// in-transit. On-hand totals are unchanged until receipt.
    pub(crate) async fn stage_outbound(
        &self,
        source_warehouse_id: Uuid,
        items: &[TransferItem],
    ) -> Result<(), ServiceError> {
        let keys = items
            .iter()
            .map(|i| (i.product_id, source_warehouse_id))
            .collect();
        let _guards = self.acquire_all(keys).await;

        let mut staged = Vec::with_capacity(items.len());
        for item in items {
            let mut level = self
                .load_or_empty(item.product_id, source_warehouse_id)
                .await?;
            if level.available < item.quantity {
                return Err(ServiceError::InsufficientInventory {
                    product_id: item.product_id,
                    warehouse_id: source_warehouse_id,
                    requested: item.quantity,
                    available: level.available,
                });
            }
            level.in_transit += item.quantity;
            staged.push(level);
        }
        for level in staged {
            self.store(level).await?;
        }
        Ok(())
    }

    /// Reverses [`stage_outbound`] when a transfer is cancelled.
    pub(crate) async fn release_outbound(
        &self,
        source_warehouse_id: Uuid,
        items: &[TransferItem],
    ) -> Result<(), ServiceError> {
        let keys = items
            .iter()
            .map(|i| (i.product_id, source_warehouse_id))
            .collect();
        let _guards = self.acquire_all(keys).await;

        for item in items {
            let mut level = self
                .load_or_empty(item.product_id, source_warehouse_id)
                .await?;
            level.in_transit -= item.quantity.min(level.in_transit);
            self.store(level).await?;
        }
        Ok(())
    }

    /// Completes a received transfer: the staged units leave the source's
    /// on-hand total and in-transit pool, and land on the destination as
    /// on-hand, available stock. Destination rows are created on demand.
    pub(crate) async fn commit_transfer(
        &self,
        source_warehouse_id: Uuid,
        destination_warehouse_id: Uuid,
        items: &[TransferItem],
    ) -> Result<(), ServiceError> {
        let keys = items
            .iter()
            .flat_map(|i| {
                [
                    (i.product_id, source_warehouse_id),
                    (i.product_id, destination_warehouse_id),
                ]
            })
            .collect();
        let _guards = self.acquire_all(keys).await;

        for item in items {
            let mut source = self
                .load_or_empty(item.product_id, source_warehouse_id)
                .await?;
            source.total_quantity -= item.quantity;
            source.in_transit -= item.quantity;
            self.store(source).await?;

            let mut dest = self
                .load_or_empty(item.product_id, destination_warehouse_id)
                .await?;
            dest.total_quantity += item.quantity;
            self.store(dest).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::warehouse::{Address, Capacity, Warehouse, WarehouseType};
    use crate::repositories::memory::{InMemoryInventoryRepository, InMemoryWarehouseRepository};
    use assert_matches::assert_matches;

    async fn service_with_warehouse() -> (InventoryService, Uuid) {
        let warehouse_repo = Arc::new(InMemoryWarehouseRepository::new());
        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            code: "W1".into(),
            name: "Main".into(),
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
        };
        let id = warehouse.id;
        warehouse_repo.upsert(warehouse).await.unwrap();

        let (sender, mut rx) = crate::events::channel(64);
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let svc = InventoryService::new(
            Arc::new(InMemoryInventoryRepository::new()),
            warehouse_repo,
            sender,
        );
        (svc, id)
    }

    #[tokio::test]
    async fn receive_then_reserve_updates_available() {
        let (svc, warehouse) = service_with_warehouse().await;
        let product = Uuid::new_v4();

        let level = svc.receive_stock(product, warehouse, 50, None).await.unwrap();
        assert_eq!(level.available, 50);

        let level = svc.reserve(product, warehouse, 20).await.unwrap();
        assert_eq!(level.total_quantity, 50);
        assert_eq!(level.reserved, 20);
        assert_eq!(level.available, 30);

        let level = svc.release(product, warehouse, 20).await.unwrap();
        assert_eq!(level.available, 50);
    }

    #[tokio::test]
    async fn reserve_beyond_available_is_rejected() {
        let (svc, warehouse) = service_with_warehouse().await;
        let product = Uuid::new_v4();
        svc.receive_stock(product, warehouse, 5, None).await.unwrap();

        let err = svc.reserve(product, warehouse, 6).await.unwrap_err();
        assert_matches!(
            err,
            ServiceError::InsufficientInventory {
                requested: 6,
                available: 5,
                ..
            }
        );
        // Nothing was mutated by the failed call.
        let level = svc.get_level(product, warehouse).await.unwrap().unwrap();
        assert_eq!(level.reserved, 0);
        assert_eq!(level.available, 5);
    }

    #[tokio::test]
    async fn contended_reservations_never_oversell() {
        let (svc, warehouse) = service_with_warehouse().await;
        let product = Uuid::new_v4();
        svc.receive_stock(product, warehouse, 10, None).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let svc = svc.clone();
            tasks.push(tokio::spawn(async move {
                svc.reserve(product, warehouse, 1).await.is_ok()
            }));
        }
        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 10, "exactly 10 reservations should succeed");

        let level = svc.get_level(product, warehouse).await.unwrap().unwrap();
        assert_eq!(level.reserved, 10);
        assert_eq!(level.available, 0);
    }

    #[tokio::test]
    async fn receive_into_unknown_warehouse_fails() {
        let (svc, _) = service_with_warehouse().await;
        let err = svc
            .receive_stock(Uuid::new_v4(), Uuid::new_v4(), 10, None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::WarehouseNotFound(_));
    }

    #[tokio::test]
    async fn staging_is_all_or_nothing_across_items() {
        let (svc, warehouse) = service_with_warehouse().await;
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        svc.receive_stock(p1, warehouse, 30, None).await.unwrap();
        svc.receive_stock(p2, warehouse, 5, None).await.unwrap();

        let items = vec![
            TransferItem {
                product_id: p1,
                quantity: 10,
            },
            TransferItem {
                product_id: p2,
                quantity: 6,
            },
        ];
        let err = svc.stage_outbound(warehouse, &items).await.unwrap_err();
        assert_matches!(err, ServiceError::InsufficientInventory { .. });

        // The first item must not have been staged.
        let level = svc.get_level(p1, warehouse).await.unwrap().unwrap();
        assert_eq!(level.in_transit, 0);
        assert_eq!(level.available, 30);
    }
}
