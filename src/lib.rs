//! Fulfillment Core
//!
//! Allocation of customer order demand across a network of physical
//! warehouses: per-location stock tracking, inter-warehouse transfers
//! with inventory side-effects, demand forecasting and periodic stock
//! rebalancing. This crate is a pure computation/state library; durable
//! storage, scheduling, order intake and delivery of notifications are
//! external collaborators reached through the `repositories` traits and
//! the event channel.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use repositories::memory::{
    InMemoryInventoryRepository, InMemoryTransferRepository, InMemoryWarehouseRepository,
};
use repositories::{InventoryRepository, TransferRepository, WarehouseRepository};
use services::allocation::AllocationService;
use services::forecasting::ForecastingService;
use services::inventory::InventoryService;
use services::rebalancing::RebalancingService;
use services::transfers::TransferService;
use services::warehouses::WarehouseService;

/// Fully wired service bundle.
///
/// Consumers embedding the crate into a service layer construct this once
/// with their repository implementations and clone the services they
/// expose.
#[derive(Clone)]
pub struct Core {
    pub warehouses: WarehouseService,
    pub inventory: InventoryService,
    pub allocation: AllocationService,
    pub transfers: TransferService,
    pub forecasting: ForecastingService,
    pub rebalancing: RebalancingService,
    pub event_sender: events::EventSender,
}

impl Core {
    /// Wires the services against the given repositories.
    pub fn new(
        warehouse_repo: Arc<dyn WarehouseRepository>,
        inventory_repo: Arc<dyn InventoryRepository>,
        transfer_repo: Arc<dyn TransferRepository>,
        event_sender: events::EventSender,
    ) -> Self {
        let inventory = InventoryService::new(
            inventory_repo.clone(),
            warehouse_repo.clone(),
            event_sender.clone(),
        );
        Self {
            warehouses: WarehouseService::new(
                warehouse_repo.clone(),
                inventory_repo.clone(),
                event_sender.clone(),
            ),
            allocation: AllocationService::new(inventory_repo.clone()),
            transfers: TransferService::new(
                transfer_repo,
                warehouse_repo.clone(),
                inventory.clone(),
                event_sender.clone(),
            ),
            rebalancing: RebalancingService::new(
                inventory_repo,
                warehouse_repo,
                event_sender.clone(),
            ),
            forecasting: ForecastingService::new(),
            inventory,
            event_sender,
        }
    }

    /// Wires the services against fresh in-memory repositories. Intended
    /// for tests and examples; events sent on the returned channel must be
    /// drained by the caller.
    pub fn in_memory(event_capacity: usize) -> (Self, tokio::sync::mpsc::Receiver<events::Event>) {
        let (event_sender, receiver) = events::channel(event_capacity);
        let core = Self::new(
            Arc::new(InMemoryWarehouseRepository::new()),
            Arc::new(InMemoryInventoryRepository::new()),
            Arc::new(InMemoryTransferRepository::new()),
            event_sender,
        );
        (core, receiver)
    }
}
