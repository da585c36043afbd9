//! LogiFlow dashboard runner
//!
//! Hydrates the stored session, keeps the order list current over the
//! realtime channel, and logs every change until interrupted.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use logiflow_auth::{FileTokenStore, HttpAuthApi, SessionManager, landing_path};
use logiflow_client::{OrderFeed, OrdersClient, QueryCache};
use logiflow_core::config::{AppConfig, LogFormat};
use logiflow_core::error::AppError;
use logiflow_core::traits::TokenProvider;
use logiflow_realtime::RealtimeChannel;
use logiflow_realtime::topics::ORDERS_TOPIC;

/// Time allowed for the channel to say goodbye on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Dashboard error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("LOGIFLOW_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    let env = std::env::var("LOGIFLOW_ENV").unwrap_or_else(|_| "development".to_string());

    AppConfig::load(&config_path, &env)
        .map_err(|e| AppError::configuration(format!("Config load error: {}", e)))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        LogFormat::Pretty => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main dashboard run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting LogiFlow dashboard v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Session ──────────────────────────────────────────
    let api = Arc::new(HttpAuthApi::new(&config.api)?);
    let store = Arc::new(FileTokenStore::new(config.storage.session_file.clone()));
    let cache = QueryCache::new(&config.orders);
    let session = Arc::new(SessionManager::new(api, store).with_cache(Arc::new(cache.clone())));
    session.init().await;

    let Some(user) = session.current_user() else {
        tracing::warn!("No stored session; sign in with `logiflow login` first");
        return Ok(());
    };
    tracing::info!(
        user = %user.display_name,
        role = %user.role.display_name(),
        landing = landing_path(user.role),
        "Session restored"
    );

    // ── Step 2: Order feed ───────────────────────────────────────
    let tokens: Arc<dyn TokenProvider> = session.clone();
    let orders = OrdersClient::new(&config.api, &config.orders, tokens.clone())?.with_cache(cache);
    let feed = OrderFeed::start(orders);

    // ── Step 3: Realtime channel ─────────────────────────────────
    let channel = RealtimeChannel::builder(config.realtime.clone(), tokens)
        .topics(vec![ORDERS_TOPIC.to_string()])
        .events(Arc::new(feed.clone()))
        .build();
    channel.connect()?;
    tracing::info!(url = %config.realtime.url, "Realtime channel connecting");

    // ── Step 4: Follow changes until shutdown ────────────────────
    let mut snapshots = feed.watch();
    let mut states = channel.watch_state();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                match &snapshot.last_error {
                    Some(e) => tracing::warn!(error = %e, "Order refresh failed"),
                    None => tracing::info!(
                        orders = snapshot.orders.len(),
                        demo = snapshot.demo,
                        revision = snapshot.revision,
                        "Orders updated"
                    ),
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                tracing::info!(state = %state, "Realtime channel state");
            }
        }
    }

    // ── Step 5: Graceful shutdown ────────────────────────────────
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, channel.disconnect())
        .await
        .is_err()
    {
        tracing::warn!("Realtime channel did not close in time");
    }

    tracing::info!("LogiFlow dashboard stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
