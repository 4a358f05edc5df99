use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::pricing::{resolve_fee, FeeSelector};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::order::{DeliveryStatus, Order, PaymentStatus};
use crate::models::review::Review;
use crate::state::AppState;

/// Proof of payment is a fixed-width attestation code; the payment itself
/// happens off-platform and is never verified here.
pub const PROOF_OF_PAYMENT_LEN: usize = 10;

pub struct SubmitOrder {
    pub farmer_id: Uuid,
    pub product_id: Uuid,
    pub payment_reference: String,
    pub proof_of_payment: Option<String>,
    pub selector: FeeSelector,
    pub total_price: f64,
}

/// Creates the order at its initial state. Atomic with fee resolution: a
/// failed quote leaves no order behind.
pub fn submit_order(state: &AppState, actor: Actor, cmd: SubmitOrder) -> Result<Order, AppError> {
    actor.require_role(Role::Buyer)?;

    if cmd.payment_reference.trim().is_empty() {
        return Err(AppError::Validation(
            "payment_reference cannot be empty".to_string(),
        ));
    }

    if let Some(proof) = &cmd.proof_of_payment {
        if proof.chars().count() != PROOF_OF_PAYMENT_LEN {
            return Err(AppError::Validation(format!(
                "proof_of_payment must be exactly {PROOF_OF_PAYMENT_LEN} characters"
            )));
        }
    }

    if !cmd.total_price.is_finite() || cmd.total_price < 0.0 {
        return Err(AppError::Validation(
            "total_price must be a non-negative number".to_string(),
        ));
    }

    let quote = resolve_fee(state, cmd.farmer_id, &cmd.selector)?;

    if cmd.total_price < quote.delivery_fee {
        return Err(AppError::Validation(format!(
            "total_price {} is below the delivery fee {}",
            cmd.total_price, quote.delivery_fee
        )));
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4(),
        buyer_id: actor.id,
        farmer_id: cmd.farmer_id,
        product_id: cmd.product_id,
        payment_reference: cmd.payment_reference,
        proof_of_payment: cmd.proof_of_payment,
        payment_status: PaymentStatus::Pending,
        delivery_status: DeliveryStatus::Pending,
        delivery_zone_id: Some(quote.zone_id),
        delivery_location_id: quote.location_id,
        quoted_fee: quote.delivery_fee,
        total_price: cmd.total_price,
        tracking_number: None,
        delivery_service: None,
        review_submitted: false,
        created_at: now,
        updated_at: now,
    };

    // Location deletion removes under this same entry lock after scanning
    // for referencing orders; holding the read guard while the row lands
    // means the order is either blocked behind the delete or visible to
    // its scan. The quote alone does not pin the location.
    let location_guard = match order.delivery_location_id {
        Some(location_id) => Some(state.locations.get(&location_id).ok_or_else(|| {
            AppError::NotFound(format!("delivery location {location_id} not found"))
        })?),
        None => None,
    };

    state.orders.insert(order.id, order.clone());
    state.metrics.open_orders.inc();
    drop(location_guard);

    info!(
        order_id = %order.id,
        buyer_id = %order.buyer_id,
        farmer_id = %order.farmer_id,
        zone = %quote.zone_name,
        fee = quote.delivery_fee,
        "order submitted"
    );

    Ok(order)
}

pub fn confirm_payment(state: &AppState, actor: Actor, order_id: Uuid) -> Result<Order, AppError> {
    actor.require_role(Role::Farmer)?;

    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    ensure_owner(&order, actor)?;

    if order.payment_status != PaymentStatus::Pending {
        return Err(AppError::state_conflict(
            PaymentStatus::Pending.to_string(),
            order.payment_status.to_string(),
        ));
    }

    order.payment_status = PaymentStatus::Confirmed;
    order.updated_at = Utc::now();

    info!(order_id = %order.id, "payment confirmed");
    Ok(order.clone())
}

pub fn ship(
    state: &AppState,
    actor: Actor,
    order_id: Uuid,
    tracking_number: String,
    delivery_service: String,
) -> Result<Order, AppError> {
    actor.require_role(Role::Farmer)?;

    if tracking_number.trim().is_empty() || delivery_service.trim().is_empty() {
        return Err(AppError::Validation(
            "tracking_number and delivery_service are required to ship".to_string(),
        ));
    }

    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    ensure_owner(&order, actor)?;

    if order.payment_status != PaymentStatus::Confirmed {
        return Err(AppError::state_conflict(
            PaymentStatus::Confirmed.to_string(),
            order.payment_status.to_string(),
        ));
    }

    if order.delivery_status != DeliveryStatus::Pending {
        return Err(AppError::state_conflict(
            DeliveryStatus::Pending.to_string(),
            order.delivery_status.to_string(),
        ));
    }

    order.delivery_status = DeliveryStatus::Shipped;
    order.tracking_number = Some(tracking_number);
    order.delivery_service = Some(delivery_service);
    order.updated_at = Utc::now();

    info!(order_id = %order.id, "order shipped");
    Ok(order.clone())
}

pub fn confirm_delivery(state: &AppState, actor: Actor, order_id: Uuid) -> Result<Order, AppError> {
    actor.require_role(Role::Buyer)?;

    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    ensure_owner(&order, actor)?;

    if order.delivery_status != DeliveryStatus::Shipped {
        return Err(AppError::state_conflict(
            DeliveryStatus::Shipped.to_string(),
            order.delivery_status.to_string(),
        ));
    }

    order.delivery_status = DeliveryStatus::Delivered;
    order.updated_at = Utc::now();
    state.metrics.open_orders.dec();

    info!(order_id = %order.id, "delivery confirmed");
    Ok(order.clone())
}

/// Terminal escape hatch, available to either owning party before the
/// order is delivered.
pub fn cancel(state: &AppState, actor: Actor, order_id: Uuid) -> Result<Order, AppError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    ensure_owner(&order, actor)?;

    if !matches!(
        order.delivery_status,
        DeliveryStatus::Pending | DeliveryStatus::Shipped
    ) {
        return Err(AppError::state_conflict(
            "Pending or Shipped",
            order.delivery_status.to_string(),
        ));
    }

    order.delivery_status = DeliveryStatus::Canceled;
    order.updated_at = Utc::now();
    state.metrics.open_orders.dec();

    info!(order_id = %order.id, canceled_by = %actor.role, "order canceled");
    Ok(order.clone())
}

pub struct SubmitReview {
    pub order_id: Uuid,
    pub rating: i32,
    pub body: String,
}

/// The order's `review_submitted` flag is the single duplicate guard; it
/// flips under the same entry guard that inserts the review row, so flag
/// and row cannot diverge.
pub fn submit_review(state: &AppState, actor: Actor, cmd: SubmitReview) -> Result<Review, AppError> {
    actor.require_role(Role::Buyer)?;

    if !(1..=5).contains(&cmd.rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let max_len = state.config.review_max_len;
    if cmd.body.trim().is_empty() || cmd.body.chars().count() > max_len {
        return Err(AppError::Validation(format!(
            "review body must be between 1 and {max_len} characters"
        )));
    }

    let mut order = state
        .orders
        .get_mut(&cmd.order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", cmd.order_id)))?;
    ensure_owner(&order, actor)?;

    if order.delivery_status != DeliveryStatus::Delivered {
        return Err(AppError::state_conflict(
            DeliveryStatus::Delivered.to_string(),
            order.delivery_status.to_string(),
        ));
    }

    if order.review_submitted {
        return Err(AppError::state_conflict(
            "no review submitted",
            "review already submitted",
        ));
    }

    let review = Review {
        id: Uuid::new_v4(),
        order_id: order.id,
        buyer_id: order.buyer_id,
        product_id: order.product_id,
        rating: cmd.rating,
        body: cmd.body,
        created_at: Utc::now(),
    };

    state.reviews.insert(review.id, review.clone());
    order.review_submitted = true;
    order.updated_at = review.created_at;

    info!(order_id = %order.id, rating = review.rating, "review submitted");
    Ok(review)
}

fn ensure_owner(order: &Order, actor: Actor) -> Result<(), AppError> {
    let owner_id = match actor.role {
        Role::Buyer => order.buyer_id,
        Role::Farmer => order.farmer_id,
    };

    if owner_id != actor.id {
        return Err(AppError::OwnershipMismatch(format!(
            "order {} belongs to a different {}",
            order.id, actor.role
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::models::zone::{DeliveryLocation, DeliveryZone};

    fn setup() -> (AppState, Actor, Actor) {
        let state = AppState::new(Config::default());
        let buyer = Actor {
            id: Uuid::new_v4(),
            role: Role::Buyer,
        };
        let farmer = Actor {
            id: Uuid::new_v4(),
            role: Role::Farmer,
        };
        (state, buyer, farmer)
    }

    fn seed_zone_and_location(state: &AppState, farmer_id: Uuid, fee: f64) -> (Uuid, Uuid) {
        let zone_id = Uuid::new_v4();
        let location_id = Uuid::new_v4();

        state.zones.insert(
            zone_id,
            DeliveryZone {
                id: zone_id,
                farmer_id,
                zone_name: "Zone A".to_string(),
                center: None,
                min_distance_km: None,
                max_distance_km: None,
                delivery_fee: None,
                created_at: Utc::now(),
            },
        );
        state.locations.insert(
            location_id,
            DeliveryLocation {
                id: location_id,
                zone_id,
                farmer_id,
                location_name: "L1".to_string(),
                delivery_fee: fee,
                created_at: Utc::now(),
            },
        );

        (zone_id, location_id)
    }

    fn submit(state: &AppState, buyer: Actor, farmer: Actor) -> Order {
        let (zone_id, location_id) = seed_zone_and_location(state, farmer.id, 200.0);
        submit_order(
            state,
            buyer,
            SubmitOrder {
                farmer_id: farmer.id,
                product_id: Uuid::new_v4(),
                payment_reference: "MPESA-001".to_string(),
                proof_of_payment: Some("ABCDEFGHIJ".to_string()),
                selector: FeeSelector::Explicit {
                    delivery_zone_id: zone_id,
                    delivery_location_id: location_id,
                },
                total_price: 1200.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn submit_order_freezes_fee_and_starts_pending() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.delivery_status, DeliveryStatus::Pending);
        assert_eq!(order.quoted_fee, 200.0);
        assert_eq!(order.total_price, 1200.0);
        assert!(!order.review_submitted);
    }

    #[test]
    fn proximity_order_records_matched_zone_without_location() {
        let (state, buyer, farmer) = setup();

        let zone_id = Uuid::new_v4();
        state.zones.insert(
            zone_id,
            DeliveryZone {
                id: zone_id,
                farmer_id: farmer.id,
                zone_name: "Nearby".to_string(),
                center: Some(crate::models::zone::GeoPoint {
                    lat: 0.0,
                    lng: 36.0,
                }),
                min_distance_km: None,
                max_distance_km: Some(10.0),
                delivery_fee: Some(150.0),
                created_at: Utc::now(),
            },
        );

        let order = submit_order(
            &state,
            buyer,
            SubmitOrder {
                farmer_id: farmer.id,
                product_id: Uuid::new_v4(),
                payment_reference: "MPESA-004".to_string(),
                proof_of_payment: None,
                selector: FeeSelector::Proximity {
                    lat: 0.01,
                    lng: 36.0,
                },
                total_price: 650.0,
            },
        )
        .unwrap();

        assert_eq!(order.delivery_zone_id, Some(zone_id));
        assert_eq!(order.delivery_location_id, None);
        assert_eq!(order.quoted_fee, 150.0);
    }

    #[test]
    fn submit_order_rejects_wrong_length_proof() {
        let (state, buyer, farmer) = setup();
        let (zone_id, location_id) = seed_zone_and_location(&state, farmer.id, 200.0);

        let err = submit_order(
            &state,
            buyer,
            SubmitOrder {
                farmer_id: farmer.id,
                product_id: Uuid::new_v4(),
                payment_reference: "MPESA-002".to_string(),
                proof_of_payment: Some("short".to_string()),
                selector: FeeSelector::Explicit {
                    delivery_zone_id: zone_id,
                    delivery_location_id: location_id,
                },
                total_price: 500.0,
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(state.orders.is_empty());
    }

    #[test]
    fn failed_quote_leaves_no_order() {
        let (state, buyer, farmer) = setup();

        let err = submit_order(
            &state,
            buyer,
            SubmitOrder {
                farmer_id: farmer.id,
                product_id: Uuid::new_v4(),
                payment_reference: "MPESA-003".to_string(),
                proof_of_payment: None,
                selector: FeeSelector::Explicit {
                    delivery_zone_id: Uuid::new_v4(),
                    delivery_location_id: Uuid::new_v4(),
                },
                total_price: 500.0,
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert!(state.orders.is_empty());
    }

    #[test]
    fn confirm_payment_requires_owning_farmer() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        let other_farmer = Actor {
            id: Uuid::new_v4(),
            role: Role::Farmer,
        };
        let err = confirm_payment(&state, other_farmer, order.id).unwrap_err();
        assert!(matches!(err, AppError::OwnershipMismatch(_)));

        let err = confirm_payment(&state, buyer, order.id).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        confirm_payment(&state, farmer, order.id).unwrap();
    }

    #[test]
    fn confirm_payment_twice_is_a_state_conflict() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        confirm_payment(&state, farmer, order.id).unwrap();
        let err = confirm_payment(&state, farmer, order.id).unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        let stored = state.orders.get(&order.id).unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Confirmed);
    }

    #[test]
    fn ship_requires_confirmed_payment_and_pending_delivery() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        let err = ship(
            &state,
            farmer,
            order.id,
            "ABC123".to_string(),
            "DHL".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        confirm_payment(&state, farmer, order.id).unwrap();
        let shipped = ship(
            &state,
            farmer,
            order.id,
            "ABC123".to_string(),
            "DHL".to_string(),
        )
        .unwrap();
        assert_eq!(shipped.delivery_status, DeliveryStatus::Shipped);
        assert_eq!(shipped.tracking_number.as_deref(), Some("ABC123"));

        // Shipped orders cannot be shipped again.
        let err = ship(
            &state,
            farmer,
            order.id,
            "XYZ".to_string(),
            "DHL".to_string(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));
    }

    #[test]
    fn ship_requires_tracking_fields() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);
        confirm_payment(&state, farmer, order.id).unwrap();

        let err = ship(&state, farmer, order.id, " ".to_string(), "DHL".to_string()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn confirm_delivery_on_pending_order_is_a_state_conflict() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        let err = confirm_delivery(&state, buyer, order.id).unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        let stored = state.orders.get(&order.id).unwrap();
        assert_eq!(stored.delivery_status, DeliveryStatus::Pending);
    }

    #[test]
    fn delivery_status_never_regresses() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        confirm_payment(&state, farmer, order.id).unwrap();
        ship(
            &state,
            farmer,
            order.id,
            "ABC123".to_string(),
            "DHL".to_string(),
        )
        .unwrap();
        confirm_delivery(&state, buyer, order.id).unwrap();

        // No transition can move a delivered order backwards or cancel it.
        let err = confirm_delivery(&state, buyer, order.id).unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));
        let err = cancel(&state, buyer, order.id).unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        let stored = state.orders.get(&order.id).unwrap();
        assert_eq!(stored.delivery_status, DeliveryStatus::Delivered);
    }

    #[test]
    fn cancel_is_allowed_from_pending_and_shipped_only() {
        let (state, buyer, farmer) = setup();

        let order = submit(&state, buyer, farmer);
        let canceled = cancel(&state, farmer, order.id).unwrap();
        assert_eq!(canceled.delivery_status, DeliveryStatus::Canceled);

        // Canceled is terminal.
        let err = cancel(&state, buyer, order.id).unwrap_err();
        assert!(matches!(err, AppError::StateConflict { .. }));

        // A shipped order can still be canceled.
        let order = submit(&state, buyer, farmer);
        confirm_payment(&state, farmer, order.id).unwrap();
        ship(
            &state,
            farmer,
            order.id,
            "ABC123".to_string(),
            "DHL".to_string(),
        )
        .unwrap();
        let canceled = cancel(&state, buyer, order.id).unwrap();
        assert_eq!(canceled.delivery_status, DeliveryStatus::Canceled);
    }

    #[test]
    fn review_requires_delivered_and_happens_once() {
        let (state, buyer, farmer) = setup();
        let order = submit(&state, buyer, farmer);

        let early = submit_review(
            &state,
            buyer,
            SubmitReview {
                order_id: order.id,
                rating: 5,
                body: "great tomatoes".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(early, AppError::StateConflict { .. }));

        confirm_payment(&state, farmer, order.id).unwrap();
        ship(
            &state,
            farmer,
            order.id,
            "ABC123".to_string(),
            "DHL".to_string(),
        )
        .unwrap();
        confirm_delivery(&state, buyer, order.id).unwrap();

        let review = submit_review(
            &state,
            buyer,
            SubmitReview {
                order_id: order.id,
                rating: 5,
                body: "great tomatoes".to_string(),
            },
        )
        .unwrap();
        assert_eq!(review.rating, 5);
        assert_eq!(state.reviews.len(), 1);

        let again = submit_review(
            &state,
            buyer,
            SubmitReview {
                order_id: order.id,
                rating: 4,
                body: "second try".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(again, AppError::StateConflict { .. }));
        assert_eq!(state.reviews.len(), 1);
    }

    #[test]
    fn review_rating_is_bounds_checked() {
        let (state, buyer, _farmer) = setup();

        for rating in [0, 6, -1] {
            let err = submit_review(
                &state,
                buyer,
                SubmitReview {
                    order_id: Uuid::new_v4(),
                    rating,
                    body: "x".to_string(),
                },
            )
            .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }
}
