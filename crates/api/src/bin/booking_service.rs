//! Booking service entry point.

use std::sync::Arc;

use api::config::{BOOKING_DEFAULT_PORT, Config};
use api::routes::bookings::BookingState;
use booking::{BookingSaga, BookingStore, HttpInventoryClient, InMemoryBookingStore, PostgresBookingStore};
use metrics_exporter_prometheus::PrometheusHandle;

#[tokio::main]
async fn main() {
    let config = Config::from_env(BOOKING_DEFAULT_PORT);
    api::init_tracing(&config);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let client = HttpInventoryClient::new(config.inventory_client())
        .expect("failed to build inventory client");
    tracing::info!(
        inventory = %config.inventory.base_url,
        max_attempts = config.inventory.max_attempts,
        "inventory client ready"
    );

    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresBookingStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run booking migrations");
            run(store, client, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, bookings are kept in memory");
            run(InMemoryBookingStore::new(), client, config, metrics_handle).await;
        }
    }
}

async fn run<S: BookingStore + 'static>(
    store: S,
    client: HttpInventoryClient,
    config: Config,
    metrics_handle: PrometheusHandle,
) {
    let state = Arc::new(BookingState {
        saga: BookingSaga::new(Arc::new(store), client),
    });
    let app = api::create_booking_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting booking service");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("booking service shut down gracefully");
}
