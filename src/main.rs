use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gamepick::{
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, MemorySessionStore, PgStore,
        RedisSessionStore, SessionStore,
    },
    routes::create_router,
    services::{providers::RawgProvider, push::TelegramPush},
    state::{self, AppState, Backends},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gamepick=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "Loaded configuration");

    // --- Database ---
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready, migrations applied");

    // --- Session store ---
    let sessions: Arc<dyn SessionStore> = match config.redis_url.as_deref() {
        Some(url) => {
            tracing::info!("Using Redis for survey sessions");
            Arc::new(RedisSessionStore::new(create_redis_client(url)?))
        }
        None => {
            tracing::warn!("REDIS_URL not set, survey sessions are kept in memory");
            Arc::new(MemorySessionStore::new())
        }
    };

    let provider = Arc::new(RawgProvider::new(
        config.rawg_api_key.clone(),
        config.rawg_api_url.clone(),
    ));
    let push = Arc::new(TelegramPush::new(
        config.telegram_bot_token.clone(),
        config.telegram_api_url.clone(),
    ));

    let backends = Backends::postgres(PgStore::new(pool), sessions, provider);

    // --- Background jobs ---
    let scheduler = state::scheduler(&backends, push, &config).spawn();

    // --- Server ---
    let app = create_router(AppState::new(&backends, &config));
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, waiting for scheduled jobs");
    scheduler.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
