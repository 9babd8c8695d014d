//! HTTP cart service.
//!
//! Routes:
//! - `POST /carts` - Add a product, creating the cart on first use
//! - `GET /carts` - Read the caller's cart
//! - `POST /carts/update-quantity` - Replace a line's quantity
//! - `POST /carts/remove-from-cart` - Remove a line
//! - `POST /carts/empty` - Remove every line
//! - `GET /carts/total-price` - Grand total for the authenticated user
//! - `GET /health` - Liveness

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod notify;
pub mod state;

use axum::body::Body;
use axum::routing::{get, post};
use axum::Router;
use http::{HeaderName, HeaderValue, Request};
use shop_observability::{RequestId, REQUEST_ID_HEADER};
use tower::ServiceBuilder;
use tower_http::request_id::{self, MakeRequestId, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use config::ServiceConfig;
pub use error::AppError;
pub use state::AppState;

/// Build the service router.
pub fn router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/carts", post(handlers::add_to_cart).get(handlers::get_cart))
        .route("/carts/update-quantity", post(handlers::set_quantity))
        .route("/carts/remove-from-cart", post(handlers::remove_line))
        .route("/carts/empty", post(handlers::empty_cart))
        .route("/carts/total-price", get(handlers::total_price))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    request_id_header.clone(),
                    GenerateRequestId,
                ))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id_header)),
        )
        .with_state(state)
}

/// Fills in `x-request-id` when the client sent none.
#[derive(Debug, Clone, Copy, Default)]
struct GenerateRequestId;

impl MakeRequestId for GenerateRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<request_id::RequestId> {
        HeaderValue::from_str(RequestId::generate().as_str())
            .ok()
            .map(request_id::RequestId::new)
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(RequestId::from_header)
        .map(|id| id.to_string())
        .unwrap_or_default();

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
