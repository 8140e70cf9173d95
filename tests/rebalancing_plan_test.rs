//! Rebalancing plan generation against a live ledger, and hand-off of the
//! drafts to the transfer service.

mod common;

use common::{core, north_of, stocked_warehouse, BANGKOK};
use fulfillment_core::models::transfer::{TransferReason, TransferStatus};
use fulfillment_core::services::transfers::TransferDraft;
use uuid::Uuid;

#[tokio::test]
async fn plan_matches_the_three_warehouse_scenario() {
    let core = core();
    let product = Uuid::new_v4();
    let a = stocked_warehouse(&core, "A", None, product, 100).await;
    let b = stocked_warehouse(&core, "B", None, product, 10).await;
    let c = stocked_warehouse(&core, "C", None, product, 10).await;
    for warehouse in [b.id, c.id] {
        core.inventory
            .set_stock_limits(product, warehouse, Some(15), None)
            .await
            .unwrap();
    }

    let plan = core.rebalancing.generate_plan().await.unwrap();

    // Mean 40: A (100) is excess, B and C (10 each, managed) are
    // deficits; each draft carries floor((100 - 40) / 2) = 30 units.
    assert_eq!(plan.transfers.len(), 2);
    for transfer in &plan.transfers {
        assert_eq!(transfer.source_warehouse_id, a.id);
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert_eq!(transfer.reason, TransferReason::Rebalancing);
        assert_eq!(transfer.items[0].quantity, 30);
    }
    assert_eq!(plan.expected_improvement_pct, 15.0);
}

#[tokio::test]
async fn drafts_execute_through_the_transfer_service() {
    let core = core();
    let product = Uuid::new_v4();
    let a = stocked_warehouse(&core, "A", None, product, 100).await;
    let b = stocked_warehouse(&core, "B", None, product, 10).await;
    core.inventory
        .set_stock_limits(product, b.id, Some(15), None)
        .await
        .unwrap();

    let plan = core.rebalancing.generate_plan().await.unwrap();
    assert_eq!(plan.transfers.len(), 1);
    let draft = &plan.transfers[0];

    // The plan does not execute itself; nothing is staged yet.
    let source = core
        .inventory
        .get_level(product, a.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(source.in_transit, 0);

    // An operator submits the draft.
    let transfer = core
        .transfers
        .create_transfer(TransferDraft {
            source_warehouse_id: draft.source_warehouse_id,
            destination_warehouse_id: draft.destination_warehouse_id,
            items: draft.items.clone(),
            reason: draft.reason,
            estimated_delivery: draft.estimated_delivery,
            cost: draft.cost,
            notes: draft.notes.clone(),
        })
        .await
        .unwrap();
    core.transfers
        .update_status(transfer.id, TransferStatus::InTransit)
        .await
        .unwrap();
    core.transfers
        .update_status(transfer.id, TransferStatus::Received)
        .await
        .unwrap();

    let destination = core
        .inventory
        .get_level(product, b.id)
        .await
        .unwrap()
        .unwrap();
    // floor((100 - 55) / 2) = 22 landed on top of the existing 10.
    assert_eq!(destination.total_quantity, 32);
}

#[tokio::test]
async fn plan_quantities_never_exceed_source_availability() {
    let core = core();
    let product = Uuid::new_v4();
    let a = stocked_warehouse(&core, "A", None, product, 100).await;
    let b = stocked_warehouse(&core, "B", None, product, 4).await;
    let c = stocked_warehouse(&core, "C", None, product, 4).await;
    for warehouse in [b.id, c.id] {
        core.inventory
            .set_stock_limits(product, warehouse, Some(10), None)
            .await
            .unwrap();
    }
    // Most of A's stock is reserved for orders.
    core.inventory.reserve(product, a.id, 65).await.unwrap();

    let plan = core.rebalancing.generate_plan().await.unwrap();

    let source_available = core
        .inventory
        .get_level(product, a.id)
        .await
        .unwrap()
        .unwrap()
        .available;
    let drafted: i32 = plan
        .transfers
        .iter()
        .flat_map(|t| t.items.iter())
        .map(|i| i.quantity)
        .sum();
    assert!(
        drafted <= source_available,
        "drafted {} exceeds available {}",
        drafted,
        source_available
    );
    // Every draft is individually creatable.
    for draft in &plan.transfers {
        core.transfers
            .create_transfer(TransferDraft {
                source_warehouse_id: draft.source_warehouse_id,
                destination_warehouse_id: draft.destination_warehouse_id,
                items: draft.items.clone(),
                reason: draft.reason,
                estimated_delivery: draft.estimated_delivery,
                cost: draft.cost,
                notes: draft.notes.clone(),
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn geocoded_lanes_get_estimated_costs() {
    let core = core();
    let product = Uuid::new_v4();
    stocked_warehouse(&core, "A", Some(BANGKOK), product, 100).await;
    let b = stocked_warehouse(&core, "B", Some(north_of(BANGKOK, 100.0)), product, 10).await;
    core.inventory
        .set_stock_limits(product, b.id, Some(15), None)
        .await
        .unwrap();

    let plan = core.rebalancing.generate_plan().await.unwrap();
    assert_eq!(plan.transfers.len(), 1);
    let cost = plan.transfers[0].cost.expect("geocoded lane is costed");
    // base 50 + ~100km * 2 + 22 units * 5 = ~360.
    assert!((330.0..390.0).contains(&cost), "cost {}", cost);
    assert_eq!(plan.estimated_total_cost, cost);
}
