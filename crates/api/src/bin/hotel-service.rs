//! Hotel service entry point.

use std::sync::Arc;

use api::config::{Config, HOTEL_SERVICE_PORT};
use api::routes::rooms::{DynInventoryStore, HotelState};
use api::server;
use inventory::{InMemoryInventoryStore, PostgresInventoryStore, seed_demo_rooms};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env(HOTEL_SERVICE_PORT);
    server::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = server::install_metrics().expect("failed to install Prometheus recorder");

    // 3. Open the inventory store
    let store: DynInventoryStore = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresInventoryStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using Postgres inventory store");
            Arc::new(store)
        }
        None => {
            let store = InMemoryInventoryStore::new();
            let rooms = seed_demo_rooms(&store).await.expect("seeding rooms failed");
            tracing::info!(rooms = rooms.len(), "using in-memory inventory store with demo rooms");
            Arc::new(store)
        }
    };

    // 4. Build the application
    let app = api::hotel_app(Arc::new(HotelState::new(store)), metrics_handle);

    // 5. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting hotel service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("hotel service shut down gracefully");
}
