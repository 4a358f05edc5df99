use dashmap::DashMap;
use uuid::Uuid;

use crate::config::Config;
use crate::models::order::Order;
use crate::models::review::Review;
use crate::models::zone::{DeliveryLocation, DeliveryZone};
use crate::observability::metrics::Metrics;

/// Shared application state: the injected store handle every operation
/// receives. Per-order transition serialization relies on the DashMap
/// entry guard: precondition check and write happen under one lock.
pub struct AppState {
    pub zones: DashMap<Uuid, DeliveryZone>,
    pub locations: DashMap<Uuid, DeliveryLocation>,
    pub orders: DashMap<Uuid, Order>,
    pub reviews: DashMap<Uuid, Review>,
    pub config: Config,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            zones: DashMap::new(),
            locations: DashMap::new(),
            orders: DashMap::new(),
            reviews: DashMap::new(),
            config,
            metrics: Metrics::new(),
        }
    }
}
