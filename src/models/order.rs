use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment status of an order. Advances Pending -> Confirmed, never back.
/// Wire form matches the values the dashboards display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    #[serde(rename = "Payment Pending")]
    Pending,
    #[serde(rename = "Payment Confirmed")]
    Confirmed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Payment Pending"),
            PaymentStatus::Confirmed => write!(f, "Payment Confirmed"),
        }
    }
}

/// Delivery status. Advances Pending -> Shipped -> Delivered; Canceled is
/// a terminal escape from Pending or Shipped only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Shipped,
    Delivered,
    Canceled,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Shipped => "Shipped",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Canceled => "Canceled",
        };
        write!(f, "{s}")
    }
}

/// One buyer's purchase of one product from one farmer, tracked through
/// payment and delivery. Never deleted; this is the transaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub product_id: Uuid,
    pub payment_reference: String,
    pub proof_of_payment: Option<String>,
    pub payment_status: PaymentStatus,
    pub delivery_status: DeliveryStatus,
    pub delivery_zone_id: Option<Uuid>,
    pub delivery_location_id: Option<Uuid>,
    pub quoted_fee: f64,
    /// Product price x quantity + delivery fee, frozen at submission.
    pub total_price: f64,
    pub tracking_number: Option<String>,
    pub delivery_service: Option<String>,
    pub review_submitted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_open(&self) -> bool {
        !matches!(
            self.delivery_status,
            DeliveryStatus::Delivered | DeliveryStatus::Canceled
        )
    }
}
