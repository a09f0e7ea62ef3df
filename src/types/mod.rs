//! Shared types for the jukebox API.
//!
//! These types are used across the application for request/response handling
//! and internal data representation.

pub mod api;
pub mod mood;
pub mod track;

use serde::{Deserialize, Serialize};

pub use api::*;
pub use mood::*;
pub use track::{AudioFeatures, InvalidFeatures, Track, TrackListing};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(default)]
    pub classifier: String,
    #[serde(default)]
    pub storage_ready: bool,
    #[serde(default)]
    pub uptime_s: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Configuration response (subset of config safe to expose)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub classifier: ClassifierInfo,
    pub server: ServerInfo,
    pub storage: StorageInfo,
    pub bot_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierInfo {
    pub backend: String,
    pub model_dir: String,
    pub load_policy: String,
    pub max_length: usize,
    pub cuda_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageInfo {
    pub backend: String,
    pub max_connections: u32,
}

/// Ready message for the chat channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingResponse {
    pub channel_id: Option<u64>,
    pub message: String,
}
