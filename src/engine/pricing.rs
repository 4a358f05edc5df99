use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::zone::{DeliveryZone, GeoPoint};
use crate::state::AppState;

/// How the buyer picked a delivery target: an explicit zone/location pair
/// from the farmer's configured list, or raw coordinates to be matched
/// against the farmer's geo-bounded zones.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FeeSelector {
    Explicit {
        delivery_zone_id: Uuid,
        delivery_location_id: Uuid,
    },
    Proximity {
        lat: f64,
        lng: f64,
    },
}

impl FeeSelector {
    pub fn mode_label(&self) -> &'static str {
        match self {
            FeeSelector::Explicit { .. } => "explicit",
            FeeSelector::Proximity { .. } => "proximity",
        }
    }
}

/// Resolved delivery charge. `distance_km` is only present for proximity
/// quotes; the buyer-side dashboard surfaces it for sanity checking.
#[derive(Debug, Clone, Serialize)]
pub struct FeeQuote {
    pub zone_id: Uuid,
    pub zone_name: String,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub delivery_fee: f64,
    pub distance_km: Option<f64>,
}

/// Read-only fee resolution; no side effects beyond metrics.
pub fn resolve_fee(
    state: &AppState,
    farmer_id: Uuid,
    selector: &FeeSelector,
) -> Result<FeeQuote, AppError> {
    match selector {
        FeeSelector::Explicit {
            delivery_zone_id,
            delivery_location_id,
        } => resolve_explicit(state, farmer_id, *delivery_zone_id, *delivery_location_id),
        FeeSelector::Proximity { lat, lng } => {
            let point = GeoPoint {
                lat: *lat,
                lng: *lng,
            };
            resolve_proximity(state, farmer_id, point)
        }
    }
}

fn resolve_explicit(
    state: &AppState,
    farmer_id: Uuid,
    zone_id: Uuid,
    location_id: Uuid,
) -> Result<FeeQuote, AppError> {
    let zone = state
        .zones
        .get(&zone_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery zone {zone_id} not found")))?;

    if zone.farmer_id != farmer_id {
        return Err(AppError::OwnershipMismatch(format!(
            "delivery zone {zone_id} does not belong to farmer {farmer_id}"
        )));
    }

    let location = state
        .locations
        .get(&location_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery location {location_id} not found")))?;

    if location.zone_id != zone_id {
        return Err(AppError::OwnershipMismatch(format!(
            "delivery location {location_id} does not belong to zone {zone_id}"
        )));
    }

    Ok(FeeQuote {
        zone_id,
        zone_name: zone.zone_name.clone(),
        location_id: Some(location_id),
        location_name: Some(location.location_name.clone()),
        delivery_fee: location.delivery_fee,
        distance_km: None,
    })
}

fn resolve_proximity(
    state: &AppState,
    farmer_id: Uuid,
    buyer: GeoPoint,
) -> Result<FeeQuote, AppError> {
    if !buyer.is_valid() {
        return Err(AppError::Validation(format!(
            "coordinates out of range: lat {}, lng {}",
            buyer.lat, buyer.lng
        )));
    }

    let zones: Vec<DeliveryZone> = state
        .zones
        .iter()
        .filter(|entry| entry.value().farmer_id == farmer_id)
        .map(|entry| entry.value().clone())
        .collect();

    if zones.is_empty() {
        return Err(AppError::NoZonesConfigured);
    }

    let min_is_upper_bound = state.config.proximity_min_is_upper_bound;
    let (zone, distance) =
        nearest_zone(&zones, &buyer, min_is_upper_bound).ok_or(AppError::NoServiceableZone)?;

    state.metrics.proximity_distance_km.observe(distance);

    // Geo-bounded zones carry a zone-level flat fee; enforced on creation.
    let delivery_fee = zone.delivery_fee.ok_or_else(|| {
        AppError::Internal(format!("geo-bounded zone {} has no delivery fee", zone.id))
    })?;

    Ok(FeeQuote {
        zone_id: zone.id,
        zone_name: zone.zone_name.clone(),
        location_id: None,
        location_name: None,
        delivery_fee,
        distance_km: Some(distance),
    })
}

/// Nearest geo-bounded zone whose distance band admits the buyer point.
/// Ties resolve arbitrarily. When `min_is_upper_bound` is set,
/// `min_distance_km` acts as a second ceiling on the computed distance
/// (the legacy matching rule); otherwise it is ignored.
pub fn nearest_zone<'a>(
    zones: &'a [DeliveryZone],
    buyer: &GeoPoint,
    min_is_upper_bound: bool,
) -> Option<(&'a DeliveryZone, f64)> {
    zones
        .iter()
        .filter(|zone| zone.is_geo_bounded())
        .filter_map(|zone| {
            let center = zone.center.as_ref()?;
            let max = zone.max_distance_km?;
            let distance = haversine_km(center, buyer);

            if distance > max {
                return None;
            }
            if min_is_upper_bound {
                if let Some(min) = zone.min_distance_km {
                    if distance > min {
                        return None;
                    }
                }
            }

            Some((zone, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::nearest_zone;
    use crate::models::zone::{DeliveryZone, GeoPoint};

    fn zone(
        name: &str,
        lat: f64,
        lng: f64,
        min_km: Option<f64>,
        max_km: f64,
        fee: f64,
    ) -> DeliveryZone {
        DeliveryZone {
            id: Uuid::new_v4(),
            farmer_id: Uuid::new_v4(),
            zone_name: name.to_string(),
            center: Some(GeoPoint { lat, lng }),
            min_distance_km: min_km,
            max_distance_km: Some(max_km),
            delivery_fee: Some(fee),
            created_at: Utc::now(),
        }
    }

    // Roughly 1 degree of latitude = 111 km, so offsets below give
    // distances of about 3 km and 12 km from the buyer.
    const BUYER: GeoPoint = GeoPoint {
        lat: 0.0,
        lng: 36.0,
    };

    #[test]
    fn nearest_qualifying_zone_wins() {
        let zones = vec![
            zone("far", 12.0 / 111.0, 36.0, None, 15.0, 300.0),
            zone("near", 3.0 / 111.0, 36.0, None, 10.0, 150.0),
        ];

        let (winner, distance) = nearest_zone(&zones, &BUYER, false).unwrap();
        assert_eq!(winner.zone_name, "near");
        assert!((distance - 3.0).abs() < 0.1);
    }

    #[test]
    fn zone_beyond_max_distance_is_not_a_candidate() {
        let zones = vec![zone("tight", 12.0 / 111.0, 36.0, None, 10.0, 300.0)];
        assert!(nearest_zone(&zones, &BUYER, false).is_none());
    }

    #[test]
    fn legacy_min_filter_rejects_distances_above_min() {
        // distance ~3 km, min 2 km: admitted only when min is ignored.
        let zones = vec![zone("band", 3.0 / 111.0, 36.0, Some(2.0), 10.0, 100.0)];

        assert!(nearest_zone(&zones, &BUYER, true).is_none());
        assert!(nearest_zone(&zones, &BUYER, false).is_some());
    }

    #[test]
    fn zones_without_geo_bounds_are_skipped() {
        let mut container_only = zone("plain", 0.0, 36.0, None, 10.0, 50.0);
        container_only.center = None;
        container_only.max_distance_km = None;
        container_only.delivery_fee = None;

        assert!(nearest_zone(&[container_only], &BUYER, false).is_none());
    }
}
