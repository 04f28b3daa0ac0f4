//! Generative-model adapters for transcript analysis.
//!
//! Model output is free text that should contain JSON. Everything here
//! parses it or falls back to an empty default; malformed output never
//! reaches the caller as an error.

mod prompts;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

use crate::config::GeminiConfig;
use crate::db::TranscriptRecord;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| GEMINI_ENDPOINT.to_string());

        info!(
            "Initialized Gemini client (model {}, endpoint {})",
            config.model, endpoint
        );

        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .context("Failed to call Gemini")?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("Failed to read Gemini response body")?;

        if !status.is_success() {
            error!("Gemini request failed with status {}: {}", status, response_text);
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                response_text
            ));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse Gemini response")?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;

        Ok(text)
    }
}

const FENCE_PATTERN: &str = r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$";

static FENCE_RE: OnceLock<Regex> = OnceLock::new();

fn fence_regex() -> &'static Regex {
    FENCE_RE.get_or_init(|| Regex::new(FENCE_PATTERN).expect("Invalid regex"))
}

/// Parse model output as JSON, tolerating a surrounding markdown fence.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    let body = fence_regex()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Model output is not valid JSON: {}", e);
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MeetingSummary {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedActionItem {
    #[serde(default)]
    pub task: String,
    pub owner: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmotionPoint {
    pub timestamp: Option<String>,
    pub emotion: Option<String>,
    pub intensity: Option<f64>,
}

/// Transcript analysis on top of a [`TextGenerator`].
#[derive(Clone)]
pub struct AiService {
    generator: Arc<dyn TextGenerator>,
}

impl AiService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    async fn ask<T: DeserializeOwned>(&self, task: &str, prompt: String) -> Option<T> {
        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to {}: {:#}", task, e);
                return None;
            }
        };

        let parsed = parse_model_json(&text);
        if parsed.is_none() {
            warn!("Could not parse model output to {}", task);
        }
        parsed
    }

    pub async fn generate_summary(&self, transcript: &str) -> MeetingSummary {
        let summary: MeetingSummary = self
            .ask("generate summary", prompts::summary(transcript))
            .await
            .unwrap_or_default();
        info!("Summary generated ({} key points)", summary.key_points.len());
        summary
    }

    pub async fn extract_action_items(&self, transcript: &str) -> Vec<ExtractedActionItem> {
        let items: Vec<ExtractedActionItem> = self
            .ask("extract action items", prompts::action_items(transcript))
            .await
            .unwrap_or_default();
        info!("Extracted {} action items", items.len());
        items
    }

    pub async fn analyze_emotions(&self, transcript: &str) -> Vec<EmotionPoint> {
        let points: Vec<EmotionPoint> = self
            .ask("analyze emotions", prompts::emotions(transcript))
            .await
            .unwrap_or_default();
        info!("Analyzed {} emotion points", points.len());
        points
    }

    /// Unique non-empty speakers in first-seen order.
    pub fn detect_participants(segments: &[TranscriptRecord]) -> Vec<String> {
        let mut participants: Vec<String> = Vec::new();
        for speaker in segments.iter().filter_map(|s| s.speaker.as_deref()) {
            let speaker = speaker.trim();
            if !speaker.is_empty() && !participants.iter().any(|p| p == speaker) {
                participants.push(speaker.to_string());
            }
        }
        participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns queued responses in order and records the prompts.
    #[derive(Default)]
    struct ScriptedGenerator {
        responses: Mutex<Vec<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn replying(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow!("no scripted response"));
            }
            responses.remove(0)
        }
    }

    #[test]
    fn test_parse_plain_and_fenced_json() {
        let plain: Option<Vec<u32>> = parse_model_json("[1, 2, 3]");
        assert_eq!(plain, Some(vec![1, 2, 3]));

        let fenced: Option<Vec<u32>> = parse_model_json("```json\n[4]\n```");
        assert_eq!(fenced, Some(vec![4]));

        let bare_fence: Option<Vec<u32>> = parse_model_json("  ```\n[5]\n```  ");
        assert_eq!(bare_fence, Some(vec![5]));
    }

    #[test]
    fn test_fence_regex_compiled_once() {
        assert!(std::ptr::eq(fence_regex(), fence_regex()));
        for _ in 0..3 {
            let fenced: Option<Vec<u32>> = parse_model_json("```json\n[7]\n```");
            assert_eq!(fenced, Some(vec![7]));
        }
    }

    #[test]
    fn test_parse_garbage_is_none() {
        let parsed: Option<MeetingSummary> = parse_model_json("Sure! Here is your summary:");
        assert!(parsed.is_none());
    }

    #[tokio::test]
    async fn test_summary_parsed() {
        let generator = ScriptedGenerator::replying(vec![Ok(
            "```json\n{\"summary\": \"Sprint review\", \"key_points\": [\"Velocity\"]}\n```"
                .to_string(),
        )]);
        let service = AiService::new(generator.clone());

        let summary = service.generate_summary("Alex: hello").await;
        assert_eq!(summary.summary, "Sprint review");
        assert_eq!(summary.key_points, vec!["Velocity"]);
        assert!(summary.decisions.is_empty());
        assert!(generator.prompts.lock().unwrap()[0].contains("Alex: hello"));
    }

    #[tokio::test]
    async fn test_failures_fall_back_to_defaults() {
        let generator = ScriptedGenerator::replying(vec![
            Err(anyhow!("quota exceeded")),
            Ok("not json".to_string()),
            Ok("{\"unexpected\": true}".to_string()),
        ]);
        let service = AiService::new(generator);

        assert_eq!(service.generate_summary("t").await, MeetingSummary::default());
        assert!(service.extract_action_items("t").await.is_empty());
        assert!(service.analyze_emotions("t").await.is_empty());
    }

    #[tokio::test]
    async fn test_action_items_and_emotions() {
        let generator = ScriptedGenerator::replying(vec![
            Ok(r#"[{"task": "Ship v2", "owner": "Sam", "priority": "high"}]"#.to_string()),
            Ok(r#"[{"timestamp": "00:30", "emotion": "happy", "intensity": 0.8}, {"emotion": "concerned"}]"#
                .to_string()),
        ]);
        let service = AiService::new(generator);

        let items = service.extract_action_items("t").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].owner.as_deref(), Some("Sam"));
        assert_eq!(items[0].due_date, None);

        let points = service.analyze_emotions("t").await;
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].intensity, None);
    }

    #[test]
    fn test_detect_participants_unique_in_order() {
        let segment = |speaker: Option<&str>| TranscriptRecord {
            speaker: speaker.map(str::to_string),
            timestamp: None,
            text: "hi".to_string(),
        };
        let segments = vec![
            segment(Some("Sam")),
            segment(None),
            segment(Some("Alex")),
            segment(Some("")),
            segment(Some("Sam")),
        ];
        assert_eq!(AiService::detect_participants(&segments), vec!["Sam", "Alex"]);
    }
}
