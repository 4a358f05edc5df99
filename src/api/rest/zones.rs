use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::zone::{DeliveryLocation, DeliveryZone, GeoPoint};
use crate::state::AppState;

const MAX_NAME_LEN: usize = 255;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/zones", post(create_zone).get(list_own_zones))
        .route("/farmers/:farmer_id/zones", get(list_farmer_zones))
        .route(
            "/zones/:zone_id/locations",
            post(create_location).get(list_locations),
        )
        .route(
            "/zones/:zone_id/locations/:location_id",
            axum::routing::delete(delete_location),
        )
}

#[derive(Deserialize)]
pub struct CreateZoneRequest {
    pub zone_name: String,
    pub center: Option<GeoPoint>,
    pub min_distance_km: Option<f64>,
    pub max_distance_km: Option<f64>,
    pub delivery_fee: Option<f64>,
}

#[derive(Deserialize)]
pub struct CreateLocationRequest {
    pub location_name: String,
    pub delivery_fee: f64,
}

/// Zone plus its nested locations, the shape both dashboards consume.
#[derive(Serialize)]
pub struct ZoneView {
    #[serde(flatten)]
    pub zone: DeliveryZone,
    pub locations: Vec<DeliveryLocation>,
}

fn validated_name(raw: &str, field: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "{field} must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

async fn create_zone(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateZoneRequest>,
) -> Result<Json<DeliveryZone>, AppError> {
    actor.require_role(Role::Farmer)?;

    let zone_name = validated_name(&payload.zone_name, "zone_name")?;

    // Geo bounds are all-or-nothing: a center needs a max distance and a
    // zone-level fee to be matchable; min_distance stays optional. A lone
    // delivery_fee counts as geo intent too, so container zones price per
    // location only.
    let has_geo = payload.center.is_some()
        || payload.max_distance_km.is_some()
        || payload.delivery_fee.is_some();
    if has_geo {
        let center = payload.center.ok_or_else(|| {
            AppError::Validation("geo-bounded zones require a center".to_string())
        })?;
        if !center.is_valid() {
            return Err(AppError::Validation(format!(
                "coordinates out of range: lat {}, lng {}",
                center.lat, center.lng
            )));
        }
        let max = payload.max_distance_km.ok_or_else(|| {
            AppError::Validation("geo-bounded zones require max_distance_km".to_string())
        })?;
        let fee = payload.delivery_fee.ok_or_else(|| {
            AppError::Validation("geo-bounded zones require a delivery_fee".to_string())
        })?;

        for (name, value) in [
            ("max_distance_km", max),
            ("delivery_fee", fee),
            ("min_distance_km", payload.min_distance_km.unwrap_or(0.0)),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Validation(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
    } else if payload.min_distance_km.is_some() {
        return Err(AppError::Validation(
            "min_distance_km only applies to geo-bounded zones".to_string(),
        ));
    }

    let zone = DeliveryZone {
        id: Uuid::new_v4(),
        farmer_id: actor.id,
        zone_name,
        center: payload.center,
        min_distance_km: payload.min_distance_km,
        max_distance_km: payload.max_distance_km,
        delivery_fee: payload.delivery_fee,
        created_at: Utc::now(),
    };

    state.zones.insert(zone.id, zone.clone());
    tracing::info!(zone_id = %zone.id, farmer_id = %actor.id, "delivery zone created");

    Ok(Json(zone))
}

async fn list_own_zones(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<ZoneView>>, AppError> {
    actor.require_role(Role::Farmer)?;
    Ok(Json(zone_views(&state, actor.id)))
}

async fn list_farmer_zones(
    State(state): State<Arc<AppState>>,
    Path(farmer_id): Path<Uuid>,
) -> Result<Json<Vec<ZoneView>>, AppError> {
    let views = zone_views(&state, farmer_id);
    if views.is_empty() {
        return Err(AppError::NoZonesConfigured);
    }
    Ok(Json(views))
}

fn zone_views(state: &AppState, farmer_id: Uuid) -> Vec<ZoneView> {
    state
        .zones
        .iter()
        .filter(|entry| entry.value().farmer_id == farmer_id)
        .map(|entry| {
            let zone = entry.value().clone();
            let locations = state
                .locations
                .iter()
                .filter(|loc| loc.value().zone_id == zone.id)
                .map(|loc| loc.value().clone())
                .collect();
            ZoneView { zone, locations }
        })
        .collect()
}

async fn create_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(zone_id): Path<Uuid>,
    Json(payload): Json<CreateLocationRequest>,
) -> Result<Json<DeliveryLocation>, AppError> {
    actor.require_role(Role::Farmer)?;

    let zone = state
        .zones
        .get(&zone_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery zone {zone_id} not found")))?;
    if zone.farmer_id != actor.id {
        return Err(AppError::OwnershipMismatch(format!(
            "delivery zone {zone_id} belongs to a different farmer"
        )));
    }

    let location_name = validated_name(&payload.location_name, "location_name")?;
    if !payload.delivery_fee.is_finite() || payload.delivery_fee < 0.0 {
        return Err(AppError::Validation(
            "delivery_fee must be a non-negative number".to_string(),
        ));
    }

    let location = DeliveryLocation {
        id: Uuid::new_v4(),
        zone_id,
        farmer_id: actor.id,
        location_name,
        delivery_fee: payload.delivery_fee,
        created_at: Utc::now(),
    };

    state.locations.insert(location.id, location.clone());
    tracing::info!(location_id = %location.id, zone_id = %zone_id, "delivery location created");

    Ok(Json(location))
}

async fn list_locations(
    State(state): State<Arc<AppState>>,
    Path(zone_id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryLocation>>, AppError> {
    if !state.zones.contains_key(&zone_id) {
        return Err(AppError::NotFound(format!(
            "delivery zone {zone_id} not found"
        )));
    }

    let locations = state
        .locations
        .iter()
        .filter(|entry| entry.value().zone_id == zone_id)
        .map(|entry| entry.value().clone())
        .collect();

    Ok(Json(locations))
}

async fn delete_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((zone_id, location_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    actor.require_role(Role::Farmer)?;

    let zone = state
        .zones
        .get(&zone_id)
        .ok_or_else(|| AppError::NotFound(format!("delivery zone {zone_id} not found")))?;
    if zone.farmer_id != actor.id {
        return Err(AppError::OwnershipMismatch(format!(
            "delivery zone {zone_id} belongs to a different farmer"
        )));
    }
    drop(zone);

    {
        let location = state.locations.get(&location_id).ok_or_else(|| {
            AppError::NotFound(format!("delivery location {location_id} not found"))
        })?;
        if location.zone_id != zone_id {
            return Err(AppError::NotFound(format!(
                "delivery location {location_id} not found in zone {zone_id}"
            )));
        }
    }

    // Orders keep their fee history through the referenced location; a
    // location with orders against it cannot be removed. The scan runs
    // under the location's entry write lock, and order submission holds
    // the matching read guard while its row lands, so a racing submit
    // either blocks this removal or is visible to the scan.
    let removed = state.locations.remove_if(&location_id, |_, _| {
        !state
            .orders
            .iter()
            .any(|entry| entry.value().delivery_location_id == Some(location_id))
    });

    if removed.is_none() {
        if state.locations.contains_key(&location_id) {
            return Err(AppError::Conflict(format!(
                "delivery location {location_id} is referenced by existing orders"
            )));
        }
        return Err(AppError::NotFound(format!(
            "delivery location {location_id} not found"
        )));
    }
    tracing::info!(location_id = %location_id, zone_id = %zone_id, "delivery location deleted");

    Ok(Json(serde_json::json!({
        "message": "location deleted successfully"
    })))
}
