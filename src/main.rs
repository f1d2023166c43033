use std::{process, sync::Arc};

use dotenvy::dotenv;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use pollverse::{
    build_router,
    config::{Config, StorageBackend},
    db::{connection::connect_store, MemoryStore, Storage},
    polls::sweeper::spawn_expiry_sweep,
    state::AppState,
    utils::clock::{Clock, SystemClock},
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    let storage: Arc<dyn Storage> = match (config.storage, config.mongo_uri.as_deref()) {
        (StorageBackend::Mongo, Some(uri)) => match connect_store(uri, &config.db_name).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!(error = %e, "failed to initialize database");
                process::exit(1);
            }
        },
        (StorageBackend::Mongo, None) => {
            error!("MONGO_URI is required for the mongo storage backend");
            process::exit(1);
        }
        (StorageBackend::Memory, _) => {
            warn!("using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sweeper = spawn_expiry_sweep(storage.clone(), clock.clone(), config.sweep_interval);

    let addr = config.server_addr;
    info!(%addr, origin = %config.cors_origin, env = %config.environment, storage = %config.storage, "starting server");

    let app = build_router(AppState::new(config, storage, clock));

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        sweeper.abort();
        process::exit(1);
    }

    sweeper.abort();
    info!("server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "failed to install terminate handler");
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
