use asset_poll::config::Config;
use asset_poll::db::Database;
use asset_poll::handlers::{self, AppState};
use asset_poll::tasks;
use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::load();

    // Initialize database
    let database = match Database::new(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    // --- Start Background Task for Expired Locks ---
    let db_clone = Arc::clone(&database);
    let sweep_interval = config.lock_sweep_interval_secs;
    tokio::spawn(async move {
        tasks::lock_sweeper::sweep_expired_locks_task(db_clone, sweep_interval).await;
    });

    let address = format!("{}:{}", config.host, config.port);
    let state = AppState::new(database, config);
    let app = handlers::router(state);

    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", address, e);
            return;
        }
    };
    info!("Server running on {}", address);

    if let Err(why) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {:?}", why);
    }

    info!("Server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
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
