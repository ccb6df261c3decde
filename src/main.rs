//! RTT Booking Server
//!
//! REST API for tour reservations, seller quotations and booking analytics.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rtt_booking::{
    api,
    config::{AppConfig, CacheBackend},
    repository::Repository,
    services::{
        cache::{Cache, CacheKeys, MemoryCache, RedisCache},
        payments::PaymentGateway,
        paypal::PayPalClient,
        tracking::TrackingService,
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rtt_booking={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting RTT Booking Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let cache: Arc<dyn Cache> = match config.cache.backend {
        CacheBackend::Redis => {
            let redis = RedisCache::new(&config.redis.url).await?;
            tracing::info!("Connected to Redis");
            Arc::new(redis)
        }
        CacheBackend::Memory => {
            tracing::info!("Using in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let gateway: Option<Arc<dyn PaymentGateway>> = if config.payments.enabled {
        let keys = CacheKeys::new(&config.cache.prefix);
        let client = PayPalClient::new(config.payments.clone(), cache.clone(), keys.paypal_token())?;
        tracing::info!("PayPal payments enabled ({})", config.payments.base_url);
        Some(Arc::new(client))
    } else {
        None
    };

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let repository = Repository::new(pool);
    let services = Services::new(repository, &config, cache, gateway);

    spawn_tracking_purge(
        services.tracking.clone(),
        Duration::from_secs(config.tracking.purge_interval_hours.max(1) * 3600),
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodic deletion of tracking events past the retention window
fn spawn_tracking_purge(tracking: TrackingService, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = tracking.purge(None).await {
                tracing::error!("Tracking purge failed: {}", e);
            }
        }
    });
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Public booking form
        .route("/bookings", post(api::bookings::create_booking))
        .route("/tracking/events", post(api::bookings::record_tracking_event))
        // Reservations
        .route("/reservations", get(api::reservations::list_reservations))
        .route("/reservations", post(api::reservations::create_reservation))
        .route("/reservations/stats", get(api::reservations::get_stats))
        .route("/reservations/tours", get(api::reservations::list_tours))
        .route("/reservations/code/:code", get(api::reservations::get_reservation_by_code))
        .route("/reservations/:id", get(api::reservations::get_reservation))
        .route("/reservations/:id", delete(api::reservations::delete_reservation))
        .route("/reservations/:id/status", put(api::reservations::update_status))
        .route("/reservations/:id/notes", put(api::reservations::update_notes))
        .route("/reservations/:id/passengers", post(api::reservations::add_passengers))
        .route("/reservations/:id/resend-email", post(api::reservations::resend_email))
        // Calendar and alerts
        .route("/calendar", get(api::reservations::get_calendar))
        .route("/calendar/:date", get(api::reservations::get_calendar_day))
        .route("/alerts/pending", get(api::reservations::pending_alerts))
        // Quotations
        .route("/quotations", get(api::quotations::list_quotations))
        .route("/quotations", post(api::quotations::create_quotation))
        .route("/quotations/stats", get(api::quotations::get_seller_stats))
        .route("/quotations/:id", get(api::quotations::get_quotation))
        .route("/quotations/:id", put(api::quotations::update_quotation))
        .route("/quotations/:id", delete(api::quotations::delete_quotation))
        .route("/quotations/:id/send", post(api::quotations::send_quotation))
        .route("/quotations/:id/reservation", put(api::quotations::link_reservation))
        // Providers
        .route("/providers", get(api::providers::list_providers))
        .route("/providers", post(api::providers::create_provider))
        .route("/providers/:id", get(api::providers::get_provider))
        .route("/providers/:id", put(api::providers::update_provider))
        .route("/providers/:id", delete(api::providers::delete_provider))
        // Tracking analytics
        .route("/tracking/stats", get(api::tracking::get_stats))
        .route("/tracking/purge", post(api::tracking::purge))
        // Payments
        .route("/payments/orders", post(api::payments::create_order))
        .route("/payments/orders/:id/capture", post(api::payments::capture_order))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
