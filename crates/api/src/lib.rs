//! HTTP surfaces of the hotel booking services.
//!
//! Two routers share one middleware stack: the public booking API that runs
//! the booking saga, and the inventory API that owns rooms and their date
//! locks. Both carry structured request tracing, a request-id correlation
//! layer and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use booking::{BookingStore, InventoryClient};
use common::REQUEST_ID_HEADER;
use inventory::RoomStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::Config;
use routes::bookings::BookingState;
use routes::rooms::InventoryState;

/// Creates the booking service router.
pub fn create_booking_app<S, C>(
    state: Arc<BookingState<S, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: BookingStore + 'static,
    C: InventoryClient + 'static,
{
    let api = Router::new()
        .route("/api/booking", post(routes::bookings::create::<S, C>))
        .route("/api/bookings", get(routes::bookings::list::<S, C>))
        .route(
            "/api/booking/{id}",
            get(routes::bookings::get::<S, C>).delete(routes::bookings::cancel::<S, C>),
        )
        .with_state(state);

    with_common_layers(api, metrics_handle)
}

/// Creates the inventory service router.
pub fn create_inventory_app<R: RoomStore + 'static>(
    state: Arc<InventoryState<R>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let api = Router::new()
        .route("/api/rooms", get(routes::rooms::list_available::<R>))
        .route("/api/rooms/recommend", get(routes::rooms::recommend::<R>))
        .route("/api/rooms/{id}", get(routes::rooms::get::<R>))
        .route(
            "/api/rooms/{id}/confirm-availability",
            post(routes::rooms::confirm_availability::<R>),
        )
        .route("/api/rooms/{id}/release", post(routes::rooms::release::<R>))
        .with_state(state);

    with_common_layers(api, metrics_handle)
}

fn with_common_layers(api: Router, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(axum::middleware::from_fn(middleware::request_id))
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &Config) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}
