//! Booking service entry point.

use std::sync::Arc;

use api::config::{BOOKING_SERVICE_PORT, Config};
use api::routes::bookings::{BookingState, DynBookingStore, DynHotelClient};
use api::{HttpHotelClient, server};
use booking::{InMemoryBookingStore, PostgresBookingStore, seed_demo_users};
use saga::BookingOrchestrator;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env(BOOKING_SERVICE_PORT);
    server::init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = server::install_metrics().expect("failed to install Prometheus recorder");

    // 3. Open the booking store
    let bookings: DynBookingStore = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresBookingStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using Postgres booking store");
            Arc::new(store)
        }
        None => {
            let store = InMemoryBookingStore::new();
            let users = seed_demo_users(&store).await.expect("seeding users failed");
            tracing::info!(users = users.len(), "using in-memory booking store with demo users");
            Arc::new(store)
        }
    };

    // 4. Wire the orchestrator to the remote hotel service
    let hotel: DynHotelClient = Arc::new(
        HttpHotelClient::new(&config.hotel_service_url, config.hotel_rpc_timeout * 2)
            .expect("failed to build HTTP client"),
    );
    tracing::info!(hotel_service_url = %config.hotel_service_url, "hotel service client ready");
    let orchestrator = BookingOrchestrator::new(bookings, hotel, config.hotel_call_policy());

    // 5. Build the application
    let app = api::booking_app(Arc::new(BookingState::new(orchestrator)), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting booking service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("booking service shut down gracefully");
}
