use quickpoll_backend::config::Config;
use quickpoll_backend::db::init_db;
use quickpoll_backend::startup::{AppState, create_router, spawn_db_health_check};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // initialize tracing, defaulting to INFO when RUST_LOG is unset
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().inspect_err(|e| error!("invalid configuration: {}", e))?;

    let db = init_db(&config.database_url, config.db_max_connections)
        .await
        .inspect_err(|e| error!("unable to initialise database: {}", e))?;
    spawn_db_health_check(db.clone());

    let app_state = AppState::new(db, config.ws_send_timeout);
    let app = create_router(app_state, config.frontend_url.as_deref());

    info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}
