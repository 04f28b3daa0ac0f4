use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Environment variables that override values from `config.toml`.
pub mod env_keys {
    pub const HOST: &str = "QUANTUM_HOST";
    pub const PORT: &str = "QUANTUM_PORT";
    pub const VEXA_API_KEY: &str = "QUANTUM_VEXA_API_KEY";
    pub const VEXA_BASE_URL: &str = "QUANTUM_VEXA_BASE_URL";
    pub const GEMINI_API_KEY: &str = "QUANTUM_GEMINI_API_KEY";
    pub const DATABASE_PATH: &str = "QUANTUM_DATABASE_PATH";
    pub const EMOTION_MODEL_PATH: &str = "QUANTUM_EMOTION_MODEL_PATH";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub vexa: VexaConfig,
    pub gemini: GeminiConfig,
    pub database: DatabaseConfig,
    pub emotion: EmotionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS in addition to http://localhost:3000
    pub frontend_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VexaConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `<data dir>/quantum/quantum.db` when unset
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Pretrained face/emotion model artifact handed to the vision command.
    pub model_path: Option<String>,
    /// Executable that runs the model (`detect` / `classify` subcommands).
    pub vision_command: String,

    pub max_people: usize,
    pub min_face_size: u32,
    pub iou_threshold: f32,
    /// Maximum centroid distance, as a multiple of the face diagonal.
    pub max_centroid_distance: f32,
    pub lookback_frames: u64,
    pub max_gap_frames: u64,

    pub min_frames: usize,
    pub min_duration_secs: f64,
    pub min_duration_ratio: f64,

    pub flush_every_frames: u64,
    pub flush_interval_secs: f64,
    pub nominal_frame_interval_secs: f64,

    pub video_sample_fps: f64,
    pub max_video_bytes: u64,
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for VexaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.cloud.vexa.ai".to_string(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-pro".to_string(),
            endpoint: None,
        }
    }
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            vision_command: "quantum-vision".to_string(),
            max_people: 5,
            min_face_size: 40,
            iou_threshold: 0.3,
            max_centroid_distance: 0.5,
            lookback_frames: 5,
            max_gap_frames: 2,
            min_frames: 30,
            min_duration_secs: 3.0,
            min_duration_ratio: 0.05,
            flush_every_frames: 10,
            flush_interval_secs: 5.0,
            nominal_frame_interval_secs: 0.5,
            video_sample_fps: 5.0,
            max_video_bytes: 500 * 1024 * 1024,
            max_frame_bytes: 10 * 1024 * 1024,
        }
    }
}

impl EmotionConfig {
    /// Resolve the model artifact path, falling back to the data directory.
    pub fn resolved_model_path(&self) -> Result<PathBuf> {
        match &self.model_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(global::models_dir()?.join("emotion-model.onnx")),
        }
    }
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => global::db_file(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            let config = Self::parse(&content)?;
            info!("Loaded config from {:?}", config_path);
            config
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(env_keys::HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(env_keys::PORT) {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {}: {}", env_keys::PORT, port),
            }
        }
        if let Some(key) = lookup(env_keys::VEXA_API_KEY) {
            self.vexa.api_key = key;
        }
        if let Some(url) = lookup(env_keys::VEXA_BASE_URL) {
            self.vexa.base_url = url;
        }
        if let Some(key) = lookup(env_keys::GEMINI_API_KEY) {
            self.gemini.api_key = key;
        }
        if let Some(path) = lookup(env_keys::DATABASE_PATH) {
            self.database.path = Some(path);
        }
        if let Some(path) = lookup(env_keys::EMOTION_MODEL_PATH) {
            self.emotion.model_path = Some(path);
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.vexa.base_url, "https://api.cloud.vexa.ai");
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.emotion.max_people, 5);
        assert_eq!(config.emotion.min_frames, 30);
        assert_eq!(config.emotion.max_video_bytes, 500 * 1024 * 1024);
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000

            [emotion]
            max_people = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.emotion.max_people, 3);
        assert_eq!(config.emotion.flush_every_frames, 10);
    }

    #[test]
    fn test_parse_invalid_config() {
        assert!(Config::parse("server = [").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env_keys::PORT, "8123"),
            (env_keys::VEXA_API_KEY, "vexa-key"),
            (env_keys::GEMINI_API_KEY, "gemini-key"),
            (env_keys::DATABASE_PATH, "/tmp/q.db"),
        ]);

        let mut config = Config::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.vexa.api_key, "vexa-key");
        assert_eq!(config.gemini.api_key, "gemini-key");
        assert_eq!(
            config.database.resolved_path().unwrap(),
            PathBuf::from("/tmp/q.db")
        );
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| (key == env_keys::PORT).then(|| "nope".to_string()));
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::parse(&text).unwrap();
        assert_eq!(parsed.emotion.vision_command, config.emotion.vision_command);
    }
}
