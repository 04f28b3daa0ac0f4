//! REST API server for Quantum.
//!
//! Provides HTTP endpoints for:
//! - Meeting bots (start, stop, status, language)
//! - Meeting data from the bot API (list, transcript, update, delete)
//! - Post-meeting processing and stored results
//! - Live and recorded emotion analysis

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::db::Database;
use crate::emotion::EmotionSessionManager;
use crate::meeting::MeetingProcessor;
use crate::vexa::MeetingBotApi;
use anyhow::Result;
use axum::{
    extract::State,
    http::HeaderValue,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const LOCAL_FRONTEND: &str = "http://localhost:3000";

/// Shared handles for every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub bots: Arc<dyn MeetingBotApi>,
    pub processor: MeetingProcessor,
    pub emotions: Arc<EmotionSessionManager>,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let meetings = routes::meetings::router()
        .merge(routes::processing::router())
        .merge(routes::emotion::router(&state.config.emotion));

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .nest("/api/bots", routes::bots::router())
        .nest("/api/meetings", meetings)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.server.frontend_url)),
        )
        .with_state(state)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in [frontend_url, LOCAL_FRONTEND] {
        match origin.parse::<HeaderValue>() {
            Ok(value) if !origins.contains(&value) => origins.push(value),
            Ok(_) => {}
            Err(_) => warn!("Ignoring invalid CORS origin: {}", origin),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn start(self) -> Result<()> {
        let addr = format!(
            "{}:{}",
            self.state.config.server.host, self.state.config.server.port
        );
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET    /                                   - Service info");
        info!("  GET    /health                             - Health check");
        info!("  POST   /api/bots/start                     - Send a bot to a meeting");
        info!("  POST   /api/bots/stop                      - Remove a bot");
        info!("  GET    /api/bots/status                    - Running bots");
        info!("  GET    /api/meetings                       - List meetings");
        info!("  POST   /api/meetings/:p/:id/process        - Process a transcript");
        info!("  POST   /api/meetings/:p/:id/start-emotion-analysis");
        info!("  POST   /api/meetings/:p/:id/process-emotion-frame");
        info!("  POST   /api/meetings/:p/:id/stop-emotion-analysis");
        info!("  POST   /api/meetings/:p/:id/analyze-video-emotions");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn service_info() -> Json<Value> {
    Json(json!({
        "service": "quantum",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "emotion_analysis": state.emotions.vision().is_ready(),
        "active_sessions": state.emotions.active_sessions(),
    }))
}
