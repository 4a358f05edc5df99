use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A farmer-defined delivery region. Either geo-bounded (center plus a
/// serviceable distance band) or a plain container for named locations;
/// both styles coexist per farmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub zone_name: String,
    pub center: Option<GeoPoint>,
    pub min_distance_km: Option<f64>,
    pub max_distance_km: Option<f64>,
    /// Zone-level flat fee; set for geo-bounded zones. Container-style
    /// zones price per location instead.
    pub delivery_fee: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryZone {
    pub fn is_geo_bounded(&self) -> bool {
        self.center.is_some() && self.max_distance_km.is_some()
    }
}

/// A named point within a zone carrying a flat delivery fee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLocation {
    pub id: Uuid,
    pub zone_id: Uuid,
    pub farmer_id: Uuid,
    pub location_name: String,
    pub delivery_fee: f64,
    pub created_at: DateTime<Utc>,
}
