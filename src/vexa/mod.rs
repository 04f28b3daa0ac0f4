//! Client for the Vexa meeting-bot API.
//!
//! Vexa owns the bot lifecycle; this module only forwards calls and returns
//! the upstream JSON unchanged.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::config::VexaConfig;

pub const DEFAULT_BOT_NAME: &str = "Quantum AI Bot";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotRequest {
    pub platform: String,
    pub native_meeting_id: String,
    /// Required for Teams meetings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    pub language: String,
    pub bot_name: String,
}

/// Metadata fields to update; empty fields are not sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingDataUpdate {
    pub name: Option<String>,
    pub participants: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl MeetingDataUpdate {
    fn to_payload(&self) -> Value {
        let mut data = Map::new();
        if let Some(name) = self.name.as_ref().filter(|s| !s.is_empty()) {
            data.insert("name".to_string(), json!(name));
        }
        if let Some(participants) = self.participants.as_ref().filter(|p| !p.is_empty()) {
            data.insert("participants".to_string(), json!(participants));
        }
        if let Some(languages) = self.languages.as_ref().filter(|l| !l.is_empty()) {
            data.insert("languages".to_string(), json!(languages));
        }
        if let Some(notes) = self.notes.as_ref().filter(|s| !s.is_empty()) {
            data.insert("notes".to_string(), json!(notes));
        }
        json!({ "data": data })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported platform: {0}")]
pub struct UnsupportedPlatform(pub String);

/// Split a meeting URL into the native meeting id and an optional passcode.
///
/// Google Meet: `https://meet.google.com/abc-defg-hij`.
/// Teams: `https://teams.live.com/meet/9366473044740?p=secret`.
pub fn extract_meeting_id(platform: &str, meeting_url: &str) -> Result<(String, Option<String>)> {
    let last_segment = meeting_url.rsplit('/').next().unwrap_or_default();
    let (id, query) = match last_segment.split_once('?') {
        Some((id, query)) => (id, Some(query)),
        None => (last_segment, None),
    };

    let passcode = match platform {
        "google_meet" => None,
        "teams" => query.and_then(|q| {
            q.split('&')
                .find_map(|param| param.strip_prefix("p="))
                .map(str::to_string)
        }),
        other => return Err(UnsupportedPlatform(other.to_string()).into()),
    };

    if id.is_empty() {
        bail!("Could not find a meeting id in {}", meeting_url);
    }

    Ok((id.to_string(), passcode))
}

#[async_trait]
pub trait MeetingBotApi: Send + Sync {
    async fn request_bot(&self, request: &BotRequest) -> Result<Value>;

    async fn stop_bot(&self, platform: &str, native_meeting_id: &str) -> Result<Value>;

    async fn get_bot_status(&self) -> Result<Value>;

    async fn update_bot_config(
        &self,
        platform: &str,
        native_meeting_id: &str,
        language: &str,
    ) -> Result<Value>;

    async fn get_transcript(&self, platform: &str, native_meeting_id: &str) -> Result<Value>;

    async fn list_meetings(&self) -> Result<Value>;

    async fn update_meeting_data(
        &self,
        platform: &str,
        native_meeting_id: &str,
        update: &MeetingDataUpdate,
    ) -> Result<Value>;

    async fn delete_meeting_transcripts(
        &self,
        platform: &str,
        native_meeting_id: &str,
    ) -> Result<Value>;
}

pub struct VexaClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VexaClient {
    pub fn new(config: &VexaConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!("Initialized Vexa client with base URL: {}", base_url);

        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url,
        }
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>, action: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Vexa {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header("X-API-Key", &self.api_key);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to {}", action))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response to {}", action))?;

        if !status.is_success() {
            error!(
                "Vexa request to {} failed with status {}: {}",
                action, status, response_text
            );
            return Err(anyhow!(
                "Failed to {}: status {}: {}",
                action,
                status,
                response_text
            ));
        }

        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_text)
            .with_context(|| format!("Invalid JSON in response to {}", action))
    }
}

#[async_trait]
impl MeetingBotApi for VexaClient {
    async fn request_bot(&self, request: &BotRequest) -> Result<Value> {
        let body = serde_json::to_value(request)?;
        let result = self.send(Method::POST, "/bots", Some(body), "request bot").await?;
        info!("Bot requested for meeting {}", request.native_meeting_id);
        Ok(result)
    }

    async fn stop_bot(&self, platform: &str, native_meeting_id: &str) -> Result<Value> {
        let path = format!("/bots/{}/{}", platform, native_meeting_id);
        let result = self.send(Method::DELETE, &path, None, "stop bot").await?;
        info!("Bot stopped for meeting {}", native_meeting_id);
        Ok(result)
    }

    async fn get_bot_status(&self) -> Result<Value> {
        self.send(Method::GET, "/bots/status", None, "get bot status")
            .await
    }

    async fn update_bot_config(
        &self,
        platform: &str,
        native_meeting_id: &str,
        language: &str,
    ) -> Result<Value> {
        let path = format!("/bots/{}/{}/config", platform, native_meeting_id);
        let body = json!({ "language": language });
        self.send(Method::PUT, &path, Some(body), "update bot config")
            .await
    }

    async fn get_transcript(&self, platform: &str, native_meeting_id: &str) -> Result<Value> {
        let path = format!("/transcripts/{}/{}", platform, native_meeting_id);
        self.send(Method::GET, &path, None, "get transcript").await
    }

    async fn list_meetings(&self) -> Result<Value> {
        self.send(Method::GET, "/meetings", None, "list meetings")
            .await
    }

    async fn update_meeting_data(
        &self,
        platform: &str,
        native_meeting_id: &str,
        update: &MeetingDataUpdate,
    ) -> Result<Value> {
        let path = format!("/meetings/{}/{}", platform, native_meeting_id);
        self.send(
            Method::PATCH,
            &path,
            Some(update.to_payload()),
            "update meeting data",
        )
        .await
    }

    async fn delete_meeting_transcripts(
        &self,
        platform: &str,
        native_meeting_id: &str,
    ) -> Result<Value> {
        let path = format!("/meetings/{}/{}", platform, native_meeting_id);
        self.send(Method::DELETE, &path, None, "delete meeting transcripts")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};

    #[test]
    fn test_extract_google_meet_id() {
        let (id, passcode) =
            extract_meeting_id("google_meet", "https://meet.google.com/abc-defg-hij?authuser=0")
                .unwrap();
        assert_eq!(id, "abc-defg-hij");
        assert_eq!(passcode, None);
    }

    #[test]
    fn test_extract_teams_id_and_passcode() {
        let (id, passcode) = extract_meeting_id(
            "teams",
            "https://teams.live.com/meet/9366473044740?x=1&p=s3cret",
        )
        .unwrap();
        assert_eq!(id, "9366473044740");
        assert_eq!(passcode, Some("s3cret".to_string()));

        let (_, passcode) =
            extract_meeting_id("teams", "https://teams.live.com/meet/9366473044740").unwrap();
        assert_eq!(passcode, None);
    }

    #[test]
    fn test_extract_unsupported_platform() {
        let err = extract_meeting_id("zoom", "https://zoom.us/j/123").unwrap_err();
        assert!(err.downcast_ref::<UnsupportedPlatform>().is_some());
    }

    #[test]
    fn test_extract_requires_id() {
        assert!(extract_meeting_id("google_meet", "https://meet.google.com/").is_err());
    }

    #[test]
    fn test_meeting_update_skips_empty_fields() {
        let update = MeetingDataUpdate {
            name: Some("Planning".to_string()),
            participants: Some(vec![]),
            languages: None,
            notes: Some(String::new()),
        };
        assert_eq!(update.to_payload(), json!({ "data": { "name": "Planning" } }));
    }

    #[test]
    fn test_bot_request_omits_missing_passcode() {
        let request = BotRequest {
            platform: "google_meet".to_string(),
            native_meeting_id: "abc".to_string(),
            passcode: None,
            language: DEFAULT_LANGUAGE.to_string(),
            bot_name: DEFAULT_BOT_NAME.to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("passcode").is_none());
        assert_eq!(value["bot_name"], "Quantum AI Bot");
    }

    async fn spawn_fake_vexa() -> String {
        async fn create_bot(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            if headers.get("X-API-Key").and_then(|v| v.to_str().ok()) != Some("test-key") {
                return (StatusCode::FORBIDDEN, Json(json!({ "detail": "bad key" })));
            }
            (
                StatusCode::CREATED,
                Json(json!({ "id": 7, "native_meeting_id": body["native_meeting_id"] })),
            )
        }

        async fn transcript(Path((platform, id)): Path<(String, String)>) -> Json<Value> {
            Json(json!({ "platform": platform, "id": id, "transcript": "hello" }))
        }

        let app = Router::new()
            .route("/bots", post(create_bot))
            .route("/transcripts/:platform/:id", get(transcript));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: String, api_key: &str) -> VexaClient {
        VexaClient::new(&VexaConfig {
            api_key: api_key.to_string(),
            base_url,
        })
    }

    #[tokio::test]
    async fn test_request_bot_sends_api_key() {
        let base_url = spawn_fake_vexa().await;
        let request = BotRequest {
            platform: "google_meet".to_string(),
            native_meeting_id: "abc-defg-hij".to_string(),
            passcode: None,
            language: "en".to_string(),
            bot_name: DEFAULT_BOT_NAME.to_string(),
        };

        let result = client(base_url.clone(), "test-key")
            .request_bot(&request)
            .await
            .unwrap();
        assert_eq!(result["native_meeting_id"], "abc-defg-hij");

        let err = client(base_url, "wrong")
            .request_bot(&request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_get_transcript_path() {
        let base_url = spawn_fake_vexa().await;
        let result = client(base_url, "test-key")
            .get_transcript("teams", "123")
            .await
            .unwrap();
        assert_eq!(result["platform"], "teams");
        assert_eq!(result["id"], "123");
    }
}
