//! Distance and shipping estimation shared by the allocation engine and
//! the rebalancing planner.

use crate::config::ShippingRateCard;
use crate::models::warehouse::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let (lat1_rad, lon1_rad) = (from.latitude.to_radians(), from.longitude.to_radians());
    let (lat2_rad, lon2_rad) = (to.latitude.to_radians(), to.longitude.to_radians());
    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;
    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Flat-rate shipping cost estimate. Unit count stands in for weight when
/// no true weight is known.
pub fn estimate_shipping_cost(rates: &ShippingRateCard, distance_km: f64, total_units: i32) -> f64 {
    rates.base + distance_km * rates.per_km + f64::from(total_units) * rates.per_unit
}

/// Delivery-time estimate as a step function of distance.
pub fn estimate_delivery_days(distance_km: f64) -> u32 {
    match distance_km {
        d if d < 50.0 => 1,
        d if d < 200.0 => 2,
        d if d < 500.0 => 3,
        d if d < 1000.0 => 5,
        _ => 7,
    }
}
