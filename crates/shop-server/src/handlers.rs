//! Cart HTTP handlers.
//!
//! Request bodies are decoded into explicit structs and checked here before
//! reaching the engine. Successful mutations answer with the cart JSON and
//! any `Set-Cookie` the engine asked for.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use shop_commerce::cart::{Cart, CartOutcome};
use shop_commerce::{Money, ProductId};

use crate::error::AppError;
use crate::identity::Caller;
use crate::state::AppState;

/// Body of `POST /carts`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartRequest {
    /// Product to add.
    #[serde(default, alias = "productId")]
    pub product_id: String,
    /// Units to add, 1 when omitted.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Body of `POST /carts/update-quantity`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetQuantityRequest {
    /// Line to change.
    #[serde(default, alias = "productId")]
    pub product_id: String,
    /// New quantity.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Body of `POST /carts/remove-from-cart`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveLineRequest {
    /// Line to remove.
    #[serde(default, alias = "productId")]
    pub product_id: String,
}

/// Response of `GET /carts/total-price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalPriceResponse {
    /// Grand total of the user's cart.
    pub total_price: Money,
}

/// `POST /carts`: 201 when the cart was created, 200 when it was added to.
pub async fn add_to_cart(
    State(state): State<AppState>,
    Caller(identity): Caller,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    let product_id = required_product(&body.product_id)?;
    let quantity = body.quantity.unwrap_or(1);

    let outcome = state
        .engine
        .add_to_cart(&identity, &product_id, quantity)
        .await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(cart_response(&state, outcome, status))
}

/// `GET /carts`: the caller's cart, or an empty placeholder.
pub async fn get_cart(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<Cart>, AppError> {
    Ok(Json(state.engine.get_cart(&identity).await?))
}

/// `POST /carts/update-quantity`
pub async fn set_quantity(
    State(state): State<AppState>,
    Caller(identity): Caller,
    payload: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    let product_id = required_product(&body.product_id)?;
    let quantity = body
        .quantity
        .ok_or_else(|| AppError::bad_request("quantity is required"))?;

    let outcome = state
        .engine
        .set_quantity(&identity, &product_id, quantity)
        .await?;
    Ok(cart_response(&state, outcome, StatusCode::OK))
}

/// `POST /carts/remove-from-cart`
pub async fn remove_line(
    State(state): State<AppState>,
    Caller(identity): Caller,
    payload: Result<Json<RemoveLineRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload?;
    let product_id = required_product(&body.product_id)?;

    let outcome = state.engine.remove_line(&identity, &product_id).await?;
    Ok(cart_response(&state, outcome, StatusCode::OK))
}

/// `POST /carts/empty`
pub async fn empty_cart(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Response, AppError> {
    let outcome = state.engine.empty_cart(&identity).await?;
    Ok(cart_response(&state, outcome, StatusCode::OK))
}

/// `GET /carts/total-price`: authenticated users only.
pub async fn total_price(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> Result<Json<TotalPriceResponse>, AppError> {
    let user_id = identity
        .user_id
        .ok_or_else(|| AppError::unauthorized("authentication required"))?;
    let total_price = state.engine.total_price(&user_id).await?;
    Ok(Json(TotalPriceResponse { total_price }))
}

/// `GET /health`
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

fn required_product(raw: &str) -> Result<ProductId, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::bad_request("product_id is required"));
    }
    Ok(ProductId::new(raw))
}

fn cart_response(state: &AppState, outcome: CartOutcome, status: StatusCode) -> Response {
    let mut headers = HeaderMap::new();
    state.cookies.apply(&outcome.cookie, &mut headers);
    (status, headers, Json(outcome.cart)).into_response()
}
