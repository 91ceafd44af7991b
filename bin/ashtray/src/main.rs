//! # Ashtray Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use ash_api::AppState;
use ash_config::{LogFormat, Settings};
use ash_core::services::{
    AccountService, AnalyticsService, RateLimitPolicy, RateLimitService, ReviewService,
};

#[cfg(feature = "db-sqlite")]
use ash_db_sqlite::SqliteStore;

#[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
use ash_db_memory::MemoryStore;

#[cfg(feature = "auth-simple")]
use ash_auth_simple::SimpleAuthProvider;

#[cfg(not(any(feature = "db-sqlite", feature = "db-memory")))]
compile_error!("enable one of the `db-sqlite` or `db-memory` features");

#[cfg(not(feature = "auth-simple"))]
compile_error!("the `auth-simple` feature is required");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings);
    if settings.dotenv_loaded {
        tracing::debug!("loaded .env file");
    }
    if settings.generated_jwt_secret {
        tracing::warn!(
            "no usable JWT secret configured, generated a random one; tokens will not survive a restart"
        );
    }

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(
        SqliteStore::new(&settings.database.url, settings.database.max_connections)
            .await
            .context("opening sqlite database")?,
    );

    #[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
    let store = {
        tracing::warn!("using the in-memory store; data is lost on shutdown");
        Arc::new(MemoryStore::new())
    };

    // 2. Initialize Auth Implementation
    let auth = Arc::new(SimpleAuthProvider::new(
        settings.jwt_secret(),
        settings.auth.token_ttl_hours,
    ));

    // 3. Wire services
    let limits = RateLimitService::new(store.clone(), policy_from(&settings));
    let state = AppState {
        accounts: AccountService::new(store.clone(), auth.clone()),
        reviews: ReviewService::new(store.clone(), limits.clone()),
        analytics: AnalyticsService::new(store),
        auth,
    };

    let prune = tokio::spawn(prune_comment_records(
        limits,
        Duration::from_secs(u64::from(settings.limits.prune_interval_minutes) * 60),
    ));

    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, environment = %settings.environment, "ashtray listening");

    axum::serve(listener, ash_api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    prune.abort();
    tracing::info!("server shut down");
    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));

    match settings.log.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

fn policy_from(settings: &Settings) -> RateLimitPolicy {
    let limits = &settings.limits;
    RateLimitPolicy {
        post_cooldown: chrono::Duration::hours(i64::from(limits.post_cooldown_hours)),
        comment_cooldown: chrono::Duration::minutes(i64::from(limits.comment_cooldown_minutes)),
        comment_retention: chrono::Duration::days(i64::from(limits.comment_retention_days)),
    }
}

/// Drops comment cooldown records that have been idle past the retention window.
async fn prune_comment_records(limits: RateLimitService, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match limits.prune_inactive_comments().await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "pruned inactive comment records"),
            Err(e) => tracing::warn!(error = %e, "comment record prune failed"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
