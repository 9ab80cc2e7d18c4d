use crate::db::connection::{DbPool, pool_stats};
use crate::live::{LiveHub, ws_handler};
use crate::polls;
use axum::{
    Json, Router,
    extract::Extension,
    http::{
        HeaderValue, Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE},
    },
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub hub: Arc<LiveHub>,
}

impl AppState {
    pub fn new(db: DbPool, ws_send_timeout: Duration) -> Self {
        AppState {
            db,
            hub: Arc::new(LiveHub::new(ws_send_timeout)),
        }
    }
}

/// Periodically checks out a connection so pool failures show up in the logs.
pub fn spawn_db_health_check(db: DbPool) {
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            match db.acquire().await {
                Ok(conn) => {
                    drop(conn);
                    debug!("{}", pool_stats(&db));
                }
                Err(e) => {
                    error!("Database connection health check failed: {}", e);
                }
            }
        }
    });
}

pub fn create_router(app_state: AppState, frontend_url: Option<&str>) -> Router {
    let api = Router::new()
        .route("/", get(polls::list_polls).post(polls::create_poll))
        .route("/:poll_id", get(polls::get_poll).delete(polls::delete_poll))
        .route(
            "/:poll_id/vote/:option_id",
            post(polls::vote_option).delete(polls::retract_vote),
        )
        .route("/:poll_id/like", post(polls::like_poll).delete(polls::unlike_poll));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        // browser clients address the collection with a trailing slash
        .route(
            "/api/polls/",
            get(polls::list_polls).post(polls::create_poll),
        )
        .nest("/api/polls", api)
        .fallback(handler_404)
        .layer(Extension(app_state))
        .layer(cors_layer(frontend_url))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = match frontend_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(_)) => {
            warn!("FRONTEND_URL is not a valid origin, mirroring request origin instead");
            AllowOrigin::mirror_request()
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Welcome to QuickPoll API" }))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
