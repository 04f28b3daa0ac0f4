use crate::ai::{AiService, GeminiClient};
use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::db::Database;
use crate::emotion::{EmotionSessionManager, VisionHandle};
use crate::meeting::MeetingProcessor;
use crate::vexa::{MeetingBotApi, VexaClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run_service() -> Result<()> {
    info!("Starting Quantum service");

    let config = Config::load()?;
    if config.vexa.api_key.is_empty() {
        warn!("Vexa API key is not set; bot endpoints will fail");
    }
    if config.gemini.api_key.is_empty() {
        warn!("Gemini API key is not set; summaries will be empty");
    }

    let db_path = config.database.resolved_path()?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {:?}", db_path))?;
    info!("Database ready at {:?}", db_path);

    let bots: Arc<dyn MeetingBotApi> = Arc::new(VexaClient::new(&config.vexa));
    let ai = AiService::new(Arc::new(GeminiClient::new(&config.gemini)));
    let processor = MeetingProcessor::new(bots.clone(), ai, db.clone());

    let vision = VisionHandle::load(&config.emotion);
    let emotions = Arc::new(EmotionSessionManager::new(
        db.clone(),
        vision,
        config.emotion.clone(),
    ));

    let state = AppState {
        config: Arc::new(config),
        db,
        bots,
        processor,
        emotions,
    };

    info!("Quantum is ready!");
    ApiServer::new(state).start().await
}
