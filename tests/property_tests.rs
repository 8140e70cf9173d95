//! Property-based tests for the allocation, transfer and forecasting
//! invariants.

mod common;

use common::{core, stocked_warehouse};
use fulfillment_core::models::allocation::{AllocationAlgorithm, AllocationStatus};
use fulfillment_core::models::forecast::{DemandObservation, ForecastModel};
use fulfillment_core::models::order::{Order, OrderItem};
use fulfillment_core::models::transfer::{TransferItem, TransferReason, TransferStatus};
use fulfillment_core::services::forecasting::{ForecastRequest, ForecastingService};
use fulfillment_core::services::shipping::estimate_delivery_days;
use fulfillment_core::services::transfers::TransferDraft;
use proptest::prelude::*;
use uuid::Uuid;

fn stock_strategy() -> impl Strategy<Value = Vec<i32>> {
    proptest::collection::vec(0i32..200, 1..5)
}

fn history_strategy() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.0f64..500.0, 7..30)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn allocation_conserves_and_labels_correctly(
        stocks in stock_strategy(),
        requested in 1i32..500,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (result, seeded_total) = rt.block_on(async {
            let core = core();
            let product = Uuid::new_v4();
            let mut warehouses = Vec::new();
            for (i, stock) in stocks.iter().enumerate() {
                warehouses.push(
                    stocked_warehouse(&core, &format!("W{}", i), None, product, *stock).await,
                );
            }
            let order = Order {
                id: Uuid::new_v4(),
                items: vec![OrderItem { product_id: product, quantity: requested }],
                customer_location: None,
                priority: 1,
            };
            let result = core
                .allocation
                .allocate(&order, &warehouses, AllocationAlgorithm::Inventory, None)
                .await
                .unwrap();
            (result, stocks.iter().sum::<i32>())
        });

        let allocated = result.total_allocated();
        prop_assert!(allocated <= requested);
        prop_assert!(allocated <= seeded_total);
        prop_assert_eq!(allocated, requested.min(seeded_total));

        let shortfall: i32 = result.unallocated.iter().map(|u| u.shortfall).sum();
        match result.status {
            AllocationStatus::Full => prop_assert_eq!(shortfall, 0),
            AllocationStatus::Partial => {
                prop_assert!(shortfall > 0);
                prop_assert!(allocated > 0);
            }
            AllocationStatus::Failed => prop_assert_eq!(allocated, 0),
        }
    }

    #[test]
    fn forecast_bounds_always_bracket_the_point(values in history_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let forecasts = rt.block_on(async {
            let svc = ForecastingService::new();
            let start = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
            let history: Vec<DemandObservation> = values
                .iter()
                .enumerate()
                .map(|(i, &quantity)| DemandObservation {
                    date: start + chrono::Duration::days(i as i64),
                    quantity,
                })
                .collect();
            let mut forecasts = Vec::new();
            for model in [ForecastModel::MovingAverage, ForecastModel::ExponentialSmoothing] {
                let request = ForecastRequest {
                    product_id: Uuid::new_v4(),
                    warehouse_id: None,
                    horizon_days: 5,
                    model,
                    as_of: chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
                };
                forecasts.push(svc.forecast(&request, &history).await.unwrap());
            }
            forecasts
        });

        for forecast in forecasts {
            prop_assert!((0.0..=1.0).contains(&forecast.accuracy));
            for point in &forecast.points {
                prop_assert!(point.lower_bound >= 0.0);
                prop_assert!(point.lower_bound <= point.predicted_demand + 1e-9);
                prop_assert!(point.predicted_demand <= point.upper_bound + 1e-9);
            }
        }
    }

    #[test]
    fn transfers_neither_create_nor_destroy_units(
        stock in 1i32..200,
        quantity in 1i32..200,
        cancel in any::<bool>(),
    ) {
        prop_assume!(quantity <= stock);
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (before, after) = rt.block_on(async {
            let core = core();
            let product = Uuid::new_v4();
            let w1 = stocked_warehouse(&core, "W1", None, product, stock).await;
            let w2 = stocked_warehouse(&core, "W2", None, product, 0).await;

            let totals = |core: fulfillment_core::Core| async move {
                let mut sum = 0;
                for warehouse in [w1.id, w2.id] {
                    if let Some(level) =
                        core.inventory.get_level(product, warehouse).await.unwrap()
                    {
                        sum += level.total_quantity;
                        assert!(level.available >= 0, "available went negative");
                    }
                }
                sum
            };

            let before = totals(core.clone()).await;
            let transfer = core
                .transfers
                .create_transfer(TransferDraft {
                    source_warehouse_id: w1.id,
                    destination_warehouse_id: w2.id,
                    items: vec![TransferItem { product_id: product, quantity }],
                    reason: TransferReason::Rebalancing,
                    estimated_delivery: None,
                    cost: None,
                    notes: None,
                })
                .await
                .unwrap();

            if cancel {
                core.transfers
                    .update_status(transfer.id, TransferStatus::Cancelled)
                    .await
                    .unwrap();
            } else {
                core.transfers
                    .update_status(transfer.id, TransferStatus::InTransit)
                    .await
                    .unwrap();
                core.transfers
                    .update_status(transfer.id, TransferStatus::Received)
                    .await
                    .unwrap();
            }
            let after = totals(core.clone()).await;

            if cancel {
                let level = core.inventory.get_level(product, w1.id).await.unwrap().unwrap();
                assert_eq!(level.available, stock);
                assert_eq!(level.in_transit, 0);
            } else {
                let destination =
                    core.inventory.get_level(product, w2.id).await.unwrap().unwrap();
                assert_eq!(destination.total_quantity, quantity);
                assert_eq!(destination.available, quantity);
            }
            (before, after)
        });
        prop_assert_eq!(before, after);
    }

    #[test]
    fn delivery_days_grow_with_distance(d1 in 0.0f64..3000.0, d2 in 0.0f64..3000.0) {
        let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
        prop_assert!(estimate_delivery_days(near) <= estimate_delivery_days(far));
    }
}
