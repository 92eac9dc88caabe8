//! API server entry point.

use dispatch::{InMemoryGeoRegistry, RedisGeoRegistry};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use trip_store::{InMemoryTripStore, PostgresTripStore};

use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
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

async fn serve<S, G>(store: S, registry: G, config: &Config)
where
    S: trip_store::TripStore + 'static,
    G: dispatch::GeoRegistry + 'static,
{
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let state = api::create_state(store, registry);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

async fn serve_with_store<S>(store: S, config: &Config)
where
    S: trip_store::TripStore + 'static,
{
    match &config.redis_url {
        Some(url) => {
            let registry = RedisGeoRegistry::connect(url)
                .await
                .expect("failed to connect to Redis");
            tracing::info!("using Redis geo registry");
            serve(store, registry, config).await;
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-memory geo registry");
            serve(store, InMemoryGeoRegistry::new(), config).await;
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to Postgres");
            let store = PostgresTripStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using Postgres trip store");
            serve_with_store(store, &config).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory trip store");
            serve_with_store(InMemoryTripStore::new(), &config).await;
        }
    }
}
