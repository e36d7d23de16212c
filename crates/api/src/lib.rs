//! HTTP services of the hotel booking system.
//!
//! Two routers live here: the hotel service (room listings and the hold
//! RPCs over the availability engine) and the booking service (the user
//! facing booking API driving the saga). Both expose `/health` and
//! Prometheus `/metrics`, and log every request through `TraceLayer`.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::bookings::BookingState;
use routes::rooms::HotelState;

pub use client::HttpHotelClient;
pub use config::Config;
pub use error::ApiError;

/// Creates the hotel service router.
pub fn hotel_app(state: Arc<HotelState>, metrics_handle: PrometheusHandle) -> Router {
    let api = Router::new()
        .route("/api/rooms", get(routes::rooms::list))
        .route("/api/rooms/recommend", get(routes::rooms::recommend))
        .route("/api/rooms/internal/recommend", get(routes::rooms::recommend))
        .route("/api/rooms/stats", get(routes::rooms::stats))
        .route(
            "/api/rooms/{id}/confirm-availability",
            post(routes::rooms::confirm_availability),
        )
        .route("/internal/rooms/{id}/release", post(routes::rooms::release))
        .with_state(state);

    with_common_layers("hotel-service", api, metrics_handle)
}

/// Creates the booking service router.
pub fn booking_app(state: Arc<BookingState>, metrics_handle: PrometheusHandle) -> Router {
    let api = Router::new()
        .route("/api/booking", post(routes::bookings::create))
        .route("/api/bookings", get(routes::bookings::list))
        .route(
            "/api/booking/{id}",
            get(routes::bookings::get).delete(routes::bookings::cancel),
        )
        .with_state(state);

    with_common_layers("booking-service", api, metrics_handle)
}

fn with_common_layers(
    service: &'static str,
    api: Router,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(move || routes::health::check(service)))
        .merge(api)
        .merge(metrics_router)
        .layer(axum::middleware::from_fn(error::with_error_path))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
