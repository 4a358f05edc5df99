use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::lifecycle::{self, SubmitOrder, SubmitReview};
use crate::engine::pricing::FeeSelector;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::order::Order;
use crate::models::review::Review;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(submit_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/confirm-payment", post(confirm_payment))
        .route("/orders/:id/ship", post(ship))
        .route("/orders/:id/confirm-delivery", post(confirm_delivery))
        .route("/orders/:id/cancel", post(cancel))
        .route("/orders/:id/review", post(submit_review))
}

#[derive(Deserialize)]
pub struct SubmitOrderRequest {
    pub farmer_id: Uuid,
    pub product_id: Uuid,
    pub payment_reference: String,
    pub proof_of_payment: Option<String>,
    #[serde(flatten)]
    pub selector: FeeSelector,
    pub total_price: f64,
}

#[derive(Deserialize)]
pub struct ShipRequest {
    pub tracking_number: String,
    pub delivery_service: String,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub rating: i32,
    pub body: String,
}

/// Order as read back by either dashboard: raw record plus resolved
/// zone/location names.
#[derive(Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub delivery_zone_name: Option<String>,
    pub delivery_location_name: Option<String>,
}

fn order_view(state: &AppState, order: Order) -> OrderView {
    let delivery_zone_name = order
        .delivery_zone_id
        .and_then(|id| state.zones.get(&id).map(|z| z.zone_name.clone()));
    let delivery_location_name = order
        .delivery_location_id
        .and_then(|id| state.locations.get(&id).map(|l| l.location_name.clone()));

    OrderView {
        order,
        delivery_zone_name,
        delivery_location_name,
    }
}

fn tracked<T>(state: &AppState, transition: &str, result: Result<T, AppError>) -> Result<T, AppError> {
    let outcome = if result.is_ok() { "success" } else { "error" };
    state.metrics.transition(transition, outcome);
    result
}

async fn submit_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<SubmitOrderRequest>,
) -> Result<Json<OrderView>, AppError> {
    let result = lifecycle::submit_order(
        &state,
        actor,
        SubmitOrder {
            farmer_id: payload.farmer_id,
            product_id: payload.product_id,
            payment_reference: payload.payment_reference,
            proof_of_payment: payload.proof_of_payment,
            selector: payload.selector,
            total_price: payload.total_price,
        },
    );

    let order = tracked(&state, "submit", result)?;
    Ok(Json(order_view(&state, order)))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Json<Vec<OrderView>> {
    let views = state
        .orders
        .iter()
        .filter(|entry| {
            let order = entry.value();
            match actor.role {
                Role::Buyer => order.buyer_id == actor.id,
                Role::Farmer => order.farmer_id == actor.id,
            }
        })
        .map(|entry| order_view(&state, entry.value().clone()))
        .collect();

    Json(views)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let order = state
        .orders
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    let owner_id = match actor.role {
        Role::Buyer => order.buyer_id,
        Role::Farmer => order.farmer_id,
    };
    if owner_id != actor.id {
        return Err(AppError::OwnershipMismatch(format!(
            "order {id} belongs to a different {}",
            actor.role
        )));
    }

    Ok(Json(order_view(&state, order)))
}

async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let result = lifecycle::confirm_payment(&state, actor, id);
    let order = tracked(&state, "confirm_payment", result)?;
    Ok(Json(order_view(&state, order)))
}

async fn ship(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipRequest>,
) -> Result<Json<OrderView>, AppError> {
    let result = lifecycle::ship(
        &state,
        actor,
        id,
        payload.tracking_number,
        payload.delivery_service,
    );
    let order = tracked(&state, "ship", result)?;
    Ok(Json(order_view(&state, order)))
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let result = lifecycle::confirm_delivery(&state, actor, id);
    let order = tracked(&state, "confirm_delivery", result)?;
    Ok(Json(order_view(&state, order)))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>, AppError> {
    let result = lifecycle::cancel(&state, actor, id);
    let order = tracked(&state, "cancel", result)?;
    Ok(Json(order_view(&state, order)))
}

async fn submit_review(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let result = lifecycle::submit_review(
        &state,
        actor,
        SubmitReview {
            order_id: id,
            rating: payload.rating,
            body: payload.body,
        },
    );

    let review = tracked(&state, "review", result)?;
    Ok(Json(review))
}
