use std::net::SocketAddr;

use axum_pg_persist::config::{PersistConfig, ServerConfig};
use axum_pg_persist::plugin::{Migration, PersistPlugin};
use axum_pg_persist::routes;
use mimalloc::MiMalloc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// M-MIMALLOC-APP: Use mimalloc as global allocator for improved performance.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axum_pg_persist=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = PersistConfig::from_env()?;
    let server = ServerConfig::from_env();

    let plugin = PersistPlugin::new(
        "persist",
        "PostgreSQL persistence with retrying executor",
        server.data_dir.clone(),
    )
    .with_migration(Migration::Directory);
    tracing::info!(
        plugin = plugin.name(),
        data_dir = %plugin.data_dir().display(),
        "Initializing persistence plugin"
    );
    let state = plugin.init(&config).await?;

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    tracing::info!(host = %addr, "Starting persistence service");

    let app = routes::router(state.clone()).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    state.shutdown().await;
    Ok(())
}
