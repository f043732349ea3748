//! Inventory service entry point.

use std::sync::Arc;

use api::config::{Config, INVENTORY_DEFAULT_PORT};
use api::extract::ServiceToken;
use api::routes::rooms::InventoryState;
use inventory::{InMemoryRoomStore, PostgresRoomStore, RoomLockManager, RoomStore};
use metrics_exporter_prometheus::PrometheusHandle;

#[tokio::main]
async fn main() {
    let config = Config::from_env(INVENTORY_DEFAULT_PORT);
    api::init_tracing(&config);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PostgresRoomStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run inventory migrations");
            run(store, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, rooms are kept in memory");
            run(InMemoryRoomStore::new(), config, metrics_handle).await;
        }
    }
}

async fn run<R: RoomStore + 'static>(store: R, config: Config, metrics_handle: PrometheusHandle) {
    let manager = RoomLockManager::new(store);
    if config.seed_demo_rooms {
        let seeded = inventory::seed_demo_rooms(manager.store())
            .await
            .expect("failed to seed demo rooms");
        tracing::info!(seeded, "demo rooms loaded");
    }

    let state = Arc::new(InventoryState {
        manager,
        service_token: ServiceToken::new(config.service_token.as_str()),
    });
    let app = api::create_inventory_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting inventory service");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("inventory service shut down gracefully");
}
