//! notekeeper-api - web server for notekeeper.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::{info, warn};

use notekeeper_core::logging::init_tracing;
use notekeeper_core::Settings;
use notekeeper_db::{log_pool_metrics, Database, PoolConfig};

use notekeeper_api::{router, AppState};

/// How often expired sessions are purged.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let _log_guard = init_tracing("notekeeper_api=info,tower_http=info", "notekeeper-api.log");

    let settings = Settings::from_env()?;
    let db = Database::connect_with_config(&settings.database_url, PoolConfig::from_env()).await?;
    db.migrate().await?;
    log_pool_metrics(db.pool());
    info!(subsystem = "api", "Database ready");

    let addr: SocketAddr = settings.bind_addr().parse()?;
    let state = AppState::new(db.store(), settings);

    let sessions = state.sessions.clone();
    let pool = db.pool().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(n) => info!(subsystem = "api", component = "session", removed = n, "Purged expired sessions"),
                Err(e) => warn!(subsystem = "api", component = "session", error = %e, "Session purge failed"),
            }
            log_pool_metrics(&pool);
        }
    });

    let app = router(state);
    info!(subsystem = "api", %addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
