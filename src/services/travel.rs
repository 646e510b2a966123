use async_trait::async_trait;
use thiserror::Error;

use crate::raids::Gym;

/// Pairwise travel duration between two gyms, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct TravelEstimate {
    pub origin_id: i64,
    pub dest_id: i64,
    pub travel_time_secs: i64,
}

#[derive(Debug, Error)]
pub enum TravelError {
    #[error("travel time lookup failed: {0}")]
    Lookup(String),
}

/// Opaque travel-time provider. Consumers only see origin/destination id
/// pairs with durations; how the durations are computed is this service's
/// business.
#[async_trait]
pub trait TravelTimeService: Send + Sync {
    async fn travel_times(
        &self,
        origins: &[Gym],
        destinations: &[Gym],
    ) -> Result<Vec<TravelEstimate>, TravelError>;
}

/// Great-circle estimate at a fixed average speed. Stands in behind the
/// same interface a real routing backend would implement.
pub struct BeelineTravel {
    speed_kmh: f64,
}

impl BeelineTravel {
    pub fn new(speed_kmh: f64) -> Self {
        Self {
            speed_kmh: if speed_kmh > 0.0 { speed_kmh } else { 30.0 },
        }
    }
}

#[async_trait]
impl TravelTimeService for BeelineTravel {
    async fn travel_times(
        &self,
        origins: &[Gym],
        destinations: &[Gym],
    ) -> Result<Vec<TravelEstimate>, TravelError> {
        let mut estimates = Vec::with_capacity(origins.len() * destinations.len());
        for origin in origins {
            for dest in destinations {
                let km = haversine_km(origin.lat, origin.lng, dest.lat, dest.lng);
                let secs = (km / self.speed_kmh * 3600.0).round() as i64;
                estimates.push(TravelEstimate {
                    origin_id: origin.id,
                    dest_id: dest.id,
                    travel_time_secs: secs,
                });
            }
        }
        Ok(estimates)
    }
}

fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}
