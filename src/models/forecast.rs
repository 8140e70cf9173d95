use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Forecasting models supported by the demand forecaster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastModel {
    MovingAverage,
    ExponentialSmoothing,
}

/// Granularity of forecast points. Only daily is produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastPeriod {
    Daily,
}

/// One observed (date, quantity) point of historical demand, supplied by
/// the sales-history collaborator in ascending date order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DemandObservation {
    pub date: NaiveDate,
    pub quantity: f64,
}

/// A single forecast point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_demand: f64,
    pub confidence: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
}

/// Forward-looking demand estimate for a product, optionally scoped to a
/// single warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandForecast {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub period: ForecastPeriod,
    pub horizon_days: u32,
    pub points: Vec<ForecastPoint>,
    pub model: ForecastModel,
    /// Rough accuracy estimate in `0.0..=1.0`; 1.0 means the history was
    /// perfectly flat.
    pub accuracy: f64,
    pub generated_at: DateTime<Utc>,
}
