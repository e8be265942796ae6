mod config;

use std::sync::Arc;

use tracing::info;

use blog_api::auth::{AppState, AppStateInner};
use blog_api::router::router;
use blog_api::service::BlogService;
use blog_api::session::SessionManager;
use blog_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_server=debug,blog_api=debug,blog_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(&config.db_path)?;

    // Shared state
    let service = BlogService::new(db, SessionManager::new(config.session_ttl));
    let state: AppState = Arc::new(AppStateInner {
        service,
        cookie_secure: config.cookie_secure,
    });

    let app = router(state);

    let addr = config.addr()?;
    info!("Blog server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
