use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::inference::LoadPolicy;

/// Most track ids the audio-features endpoint accepts per request
pub const MAX_FEATURE_BATCH: usize = 50;

/// Application configuration loaded from environment variables.
///
/// All settings can be configured via environment variables with the `JUKEBOX_` prefix.
/// For example: `JUKEBOX_SERVER__PORT=8097`, `JUKEBOX_DATABASE__URL=sqlite://tracks.db`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Mood classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Track catalog database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Catalog builder (music API) configuration
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Chat front end settings
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Directory holding the exported model and tokenizer
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default = "default_model_file")]
    pub model_file: String,

    #[serde(default = "default_tokenizer_file")]
    pub tokenizer_file: String,

    /// Longer inputs are truncated to this many tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Load the model once at startup or on every call
    #[serde(default)]
    pub load_policy: LoadPolicy,

    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,

    /// Enable CUDA acceleration
    #[serde(default)]
    pub enable_cuda: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            model_file: default_model_file(),
            tokenizer_file: default_tokenizer_file(),
            max_length: default_max_length(),
            load_policy: LoadPolicy::default(),
            intra_threads: default_intra_threads(),
            enable_cuda: false,
        }
    }
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("sentiment-trainer/checkpoint-6000")
}

fn default_model_file() -> String {
    "model.onnx".to_string()
}

fn default_tokenizer_file() -> String {
    "tokenizer.json".to_string()
}

fn default_max_length() -> usize {
    512
}

fn default_intra_threads() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://tracks.db`. Required.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8097
}

impl ServerConfig {
    /// Returns the socket address for binding the server
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// API client id. Required by the catalog builder only.
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,

    /// Track ids per audio-features request (at most 50)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between feature batches, in seconds
    #[serde(default = "default_batch_delay")]
    pub batch_delay_s: u64,

    /// Pause after each listing phase, in seconds
    #[serde(default = "default_listing_delay")]
    pub listing_delay_s: u64,

    /// Tracks requested per playlist
    #[serde(default = "default_playlist_track_limit")]
    pub playlist_track_limit: u32,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Prefix for links to source playlists
    #[serde(default = "default_playlist_link_base")]
    pub playlist_link_base: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            batch_size: default_batch_size(),
            batch_delay_s: default_batch_delay(),
            listing_delay_s: default_listing_delay(),
            playlist_track_limit: default_playlist_track_limit(),
            auth_url: default_auth_url(),
            api_base_url: default_api_base_url(),
            playlist_link_base: default_playlist_link_base(),
        }
    }
}

fn default_batch_size() -> usize {
    MAX_FEATURE_BATCH
}

fn default_batch_delay() -> u64 {
    300
}

fn default_listing_delay() -> u64 {
    60
}

fn default_playlist_track_limit() -> u32 {
    100
}

fn default_auth_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_api_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_playlist_link_base() -> String {
    "https://open.spotify.com/playlist/".to_string()
}

impl CatalogConfig {
    /// Batch size clamped to what the API accepts
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_FEATURE_BATCH)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay_s)
    }

    pub fn listing_delay(&self) -> Duration {
        Duration::from_secs(self.listing_delay_s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Channel the greeting is posted to. Required by the server.
    #[serde(default)]
    pub channel_id: Option<u64>,

    #[serde(default = "default_bot_name")]
    pub bot_name: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            bot_name: default_bot_name(),
        }
    }
}

fn default_bot_name() -> String {
    "MosikBot".to_string()
}

fn require<T>(value: &Option<T>, key: &str) -> Result<(), ConfigError> {
    match value {
        Some(_) => Ok(()),
        None => Err(ConfigError::NotFound(key.to_string())),
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables should be prefixed with `JUKEBOX_` and use
    /// double underscores for nested values:
    /// - `JUKEBOX_DATABASE__URL` -> database.url
    /// - `JUKEBOX_CLASSIFIER__LOAD_POLICY` -> classifier.load_policy
    /// - `JUKEBOX_CHAT__CHANNEL_ID` -> chat.channel_id
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("JUKEBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check the settings the recommendation server cannot run without
    pub fn validate_for_server(&self) -> Result<(), ConfigError> {
        require(&self.database.url, "database.url")?;
        require(&self.chat.channel_id, "chat.channel_id")
    }

    /// Check the settings the catalog builder cannot run without
    pub fn validate_for_builder(&self) -> Result<(), ConfigError> {
        require(&self.database.url, "database.url")?;
        require(&self.catalog.client_id, "catalog.client_id")?;
        require(&self.catalog.client_secret, "catalog.client_secret")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(
            config.classifier.model_dir,
            PathBuf::from("sentiment-trainer/checkpoint-6000")
        );
        assert_eq!(config.classifier.max_length, 512);
        assert_eq!(config.classifier.load_policy, LoadPolicy::Once);
        assert!(!config.classifier.enable_cuda);
        assert_eq!(config.server.port, 8097);
        assert_eq!(config.catalog.batch_size, 50);
        assert_eq!(config.catalog.listing_delay(), Duration::from_secs(60));
        assert_eq!(config.catalog.batch_delay(), Duration::from_secs(300));
        assert_eq!(config.chat.bot_name, "MosikBot");
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        let addr = server.socket_addr().unwrap();
        assert_eq!(addr.port(), 8097);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            port: 1,
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_batch_size_is_capped() {
        let catalog = CatalogConfig {
            batch_size: 500,
            ..Default::default()
        };
        assert_eq!(catalog.effective_batch_size(), 50);

        let catalog = CatalogConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(catalog.effective_batch_size(), 1);
    }

    #[test]
    fn test_server_requires_database_and_channel() {
        let mut config = AppConfig::default();
        assert!(matches!(
            config.validate_for_server(),
            Err(ConfigError::NotFound(key)) if key == "database.url"
        ));

        config.database.url = Some("sqlite::memory:".to_string());
        assert!(matches!(
            config.validate_for_server(),
            Err(ConfigError::NotFound(key)) if key == "chat.channel_id"
        ));

        config.chat.channel_id = Some(1234);
        assert!(config.validate_for_server().is_ok());
    }

    #[test]
    fn test_builder_requires_credentials() {
        let mut config = AppConfig::default();
        config.database.url = Some("sqlite::memory:".to_string());
        assert!(config.validate_for_builder().is_err());

        config.catalog.client_id = Some("id".to_string());
        config.catalog.client_secret = Some("secret".to_string());
        assert!(config.validate_for_builder().is_ok());
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let mut config = AppConfig::default();
        config.catalog.client_secret = Some("hunter2".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
