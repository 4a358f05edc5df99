use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Buyer review for a delivered order. One per order, immutable once
/// created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub product_id: Uuid,
    pub rating: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
