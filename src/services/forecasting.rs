//! Demand forecasting over historical (date, quantity) series.
//!
//! Two interchangeable models produce a single point estimate with bounds,
//! replicated across the forecast horizon; they do not re-fit day by day.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::config::ForecastingConfig;
use crate::errors::ServiceError;
use crate::models::forecast::{
    DemandForecast, DemandObservation, ForecastModel, ForecastPeriod, ForecastPoint,
};

const MOVING_AVERAGE_CONFIDENCE: f64 = 0.70;
const SMOOTHING_CONFIDENCE: f64 = 0.75;
/// 95% interval half-width in standard deviations.
const Z_95: f64 = 1.96;
/// Error multiplier for the smoothing model's bounds.
const SMOOTHING_BAND: f64 = 1.5;

/// Parameters of a forecast run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub product_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub horizon_days: u32,
    pub model: ForecastModel,
    /// Anchor date; forecast points are dated `as_of + 1 ..= as_of +
    /// horizon`. Defaults to today.
    pub as_of: Option<NaiveDate>,
}

/// Service producing [`DemandForecast`]s from collaborator-supplied
/// history.
#[derive(Debug, Clone, Default)]
pub struct ForecastingService {
    config: ForecastingConfig,
}

impl ForecastingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ForecastingConfig) -> Self {
        Self { config }
    }

    /// Runs the requested model over the history, which must be in
    /// ascending date order.
    #[instrument(skip(self, history), fields(product_id = %request.product_id, model = %request.model))]
    pub async fn forecast(
        &self,
        request: &ForecastRequest,
        history: &[DemandObservation],
    ) -> Result<DemandForecast, ServiceError> {
        let estimate = match request.model {
            ForecastModel::MovingAverage => self.moving_average(history)?,
            ForecastModel::ExponentialSmoothing => self.exponential_smoothing(history)?,
        };

        let as_of = request
            .as_of
            .unwrap_or_else(|| Utc::now().date_naive());
        let points = (1..=i64::from(request.horizon_days))
            .map(|offset| ForecastPoint {
                date: as_of + Duration::days(offset),
                predicted_demand: estimate.point,
                confidence: estimate.confidence,
                upper_bound: estimate.upper,
                lower_bound: estimate.lower,
            })
            .collect();

        Ok(DemandForecast {
            product_id: request.product_id,
            warehouse_id: request.warehouse_id,
            period: ForecastPeriod::Daily,
            horizon_days: request.horizon_days,
            points,
            model: request.model,
            accuracy: accuracy_from(estimate.point, estimate.dispersion),
            generated_at: Utc::now(),
        })
    }

    /// Mean of the most recent `window_size` observations; the window's
    /// standard deviation drives a 95% interval.
    fn moving_average(&self, history: &[DemandObservation]) -> Result<Estimate, ServiceError> {
        let window_size = self.config.window_size;
        if history.len() < window_size {
            return Err(ServiceError::InsufficientData {
                required: window_size,
                actual: history.len(),
            });
        }
        let window = &history[history.len() - window_size..];
        let mean = window.iter().map(|o| o.quantity).sum::<f64>() / window_size as f64;
        let variance = window
            .iter()
            .map(|o| (o.quantity - mean).powi(2))
            .sum::<f64>()
            / window_size as f64;
        let std_dev = variance.sqrt();

        Ok(Estimate {
            point: mean,
            upper: mean + Z_95 * std_dev,
            lower: (mean - Z_95 * std_dev).max(0.0),
            confidence: MOVING_AVERAGE_CONFIDENCE,
            dispersion: std_dev,
        })
    }

    /// Smooths the full history (`S_t = a*x_t + (1-a)*S_{t-1}`, seeded
    /// with the first observation); the mean absolute one-step error
    /// drives the bounds.
    fn exponential_smoothing(
        &self,
        history: &[DemandObservation],
    ) -> Result<Estimate, ServiceError> {
        let first = history.first().ok_or(ServiceError::EmptyHistory)?;
        let alpha = self.config.smoothing_factor;

        let mut smoothed = first.quantity;
        let mut abs_error_sum = 0.0;
        for observation in &history[1..] {
            abs_error_sum += (observation.quantity - smoothed).abs();
            smoothed = alpha * observation.quantity + (1.0 - alpha) * smoothed;
        }
        let avg_error = if history.len() > 1 {
            abs_error_sum / (history.len() - 1) as f64
        } else {
            0.0
        };

        Ok(Estimate {
            point: smoothed,
            upper: smoothed + SMOOTHING_BAND * avg_error,
            lower: (smoothed - SMOOTHING_BAND * avg_error).max(0.0),
            confidence: SMOOTHING_CONFIDENCE,
            dispersion: avg_error,
        })
    }
}

struct Estimate {
    point: f64,
    upper: f64,
    lower: f64,
    confidence: f64,
    dispersion: f64,
}

/// Accuracy degrades from 1.0 (flat history) toward 0.0 as dispersion
/// approaches the point estimate.
fn accuracy_from(point: f64, dispersion: f64) -> f64 {
    if point <= f64::EPSILON {
        if dispersion <= f64::EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        (1.0 - dispersion / point).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn history(values: &[f64]) -> Vec<DemandObservation> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &quantity)| DemandObservation {
                date: start + Duration::days(i as i64),
                quantity,
            })
            .collect()
    }

    fn request(model: ForecastModel, horizon: u32) -> ForecastRequest {
        ForecastRequest {
            product_id: Uuid::new_v4(),
            warehouse_id: None,
            horizon_days: horizon,
            model,
            as_of: NaiveDate::from_ymd_opt(2025, 2, 1),
        }
    }

    #[tokio::test]
    async fn flat_history_collapses_the_interval() {
        let svc = ForecastingService::new();
        let forecast = svc
            .forecast(
                &request(ForecastModel::MovingAverage, 5),
                &history(&[20.0; 7]),
            )
            .await
            .unwrap();

        assert_eq!(forecast.points.len(), 5);
        for point in &forecast.points {
            assert_eq!(point.predicted_demand, 20.0);
            assert_eq!(point.upper_bound, 20.0);
            assert_eq!(point.lower_bound, 20.0);
            assert_eq!(point.confidence, 0.70);
        }
        assert_eq!(forecast.accuracy, 1.0);
        // Points land on consecutive days after the anchor.
        assert_eq!(
            forecast.points[0].date,
            NaiveDate::from_ymd_opt(2025, 2, 2).unwrap()
        );
        assert_eq!(
            forecast.points[4].date,
            NaiveDate::from_ymd_opt(2025, 2, 6).unwrap()
        );
    }

    #[tokio::test]
    async fn moving_average_uses_only_the_window() {
        let svc = ForecastingService::new();
        // Seven trailing 10s after a noisy head.
        let mut values = vec![500.0, 900.0];
        values.extend([10.0; 7]);
        let forecast = svc
            .forecast(&request(ForecastModel::MovingAverage, 1), &history(&values))
            .await
            .unwrap();
        assert_eq!(forecast.points[0].predicted_demand, 10.0);
    }

    #[tokio::test]
    async fn short_history_is_an_error_not_a_degenerate_forecast() {
        let svc = ForecastingService::new();
        let err = svc
            .forecast(
                &request(ForecastModel::MovingAverage, 5),
                &history(&[1.0, 2.0, 3.0]),
            )
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ServiceError::InsufficientData {
                required: 7,
                actual: 3
            }
        );

        let err = svc
            .forecast(&request(ForecastModel::ExponentialSmoothing, 5), &[])
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::EmptyHistory);
    }

    #[tokio::test]
    async fn smoothing_recursion_matches_hand_computation() {
        let svc = ForecastingService::new();
        // S0 = 10; S1 = 0.3*20 + 0.7*10 = 13. One-step error |20-10| = 10.
        let forecast = svc
            .forecast(
                &request(ForecastModel::ExponentialSmoothing, 2),
                &history(&[10.0, 20.0]),
            )
            .await
            .unwrap();
        let point = &forecast.points[0];
        assert!((point.predicted_demand - 13.0).abs() < 1e-9);
        assert!((point.upper_bound - 28.0).abs() < 1e-9);
        assert_eq!(point.lower_bound, 0.0); // 13 - 15 clamps at zero
        assert_eq!(point.confidence, 0.75);
    }

    #[tokio::test]
    async fn bounds_always_bracket_the_estimate() {
        let svc = ForecastingService::new();
        let values = [3.0, 8.0, 2.0, 14.0, 9.0, 1.0, 12.0, 6.0];
        for model in [ForecastModel::MovingAverage, ForecastModel::ExponentialSmoothing] {
            let forecast = svc
                .forecast(&request(model, 3), &history(&values))
                .await
                .unwrap();
            for point in &forecast.points {
                assert!(point.lower_bound >= 0.0);
                assert!(point.lower_bound <= point.predicted_demand);
                assert!(point.predicted_demand <= point.upper_bound);
            }
            assert!((0.0..=1.0).contains(&forecast.accuracy));
        }
    }
}
