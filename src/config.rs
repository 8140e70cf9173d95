use serde::{Deserialize, Serialize};

/// Weight factors for the hybrid allocation score.
///
/// Each weight is expected to lie in `0.0..=1.0`; the defaults favour
/// proximity over inventory depth and cost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AllocationWeights {
    pub distance: f64,
    pub inventory: f64,
    pub cost: f64,
}

impl Default for AllocationWeights {
    fn default() -> Self {
        Self {
            distance: 0.4,
            inventory: 0.3,
            cost: 0.3,
        }
    }
}

/// Flat-rate shipping cost model used by the allocation engine and for
/// costing rebalancing drafts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShippingRateCard {
    /// Fixed cost per shipment.
    pub base: f64,
    /// Cost per kilometre of great-circle distance.
    pub per_km: f64,
    /// Cost per shipped unit (stand-in for weight when none is known).
    pub per_unit: f64,
}

impl Default for ShippingRateCard {
    fn default() -> Self {
        Self {
            base: 50.0,
            per_km: 2.0,
            per_unit: 5.0,
        }
    }
}

/// Parameters for the demand forecasting models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastingConfig {
    /// Number of most recent observations averaged by the moving-average model.
    pub window_size: usize,
    /// Smoothing factor alpha for exponential smoothing, in `0.0..=1.0`.
    pub smoothing_factor: f64,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            smoothing_factor: 0.3,
        }
    }
}

/// Thresholds governing rebalancing plan generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RebalancingConfig {
    /// A warehouse is excess when `total > excess_factor * mean`.
    pub excess_factor: f64,
    /// A warehouse is deficit when `total < deficit_factor * mean`
    /// and a reorder point is configured.
    pub deficit_factor: f64,
    /// Cost assumed for a draft transfer that could not be estimated.
    pub default_transfer_cost: f64,
    /// Improvement percentage reported on generated plans until real
    /// measurement exists.
    pub expected_improvement_pct: f64,
}

impl Default for RebalancingConfig {
    fn default() -> Self {
        Self {
            excess_factor: 1.5,
            deficit_factor: 0.5,
            default_transfer_cost: 100.0,
            expected_improvement_pct: 15.0,
        }
    }
}
