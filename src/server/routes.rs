//! HTTP route handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::mood::greeting as greeting_message;
use crate::types::{
    ClassifierInfo, ConfigResponse, GreetingResponse, HealthResponse, HealthStatus, ServerInfo,
    StorageInfo,
};

use super::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `MessagePack` response wrapper
pub struct MsgPack<T>(pub T);

impl<T: serde::Serialize> IntoResponse for MsgPack<T> {
    fn into_response(self) -> Response {
        match rmp_serde::to_vec_named(&self.0) {
            Ok(bytes) => (
                StatusCode::OK,
                [("content-type", "application/msgpack")],
                bytes,
            )
                .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialize response: {e}"),
            )
                .into_response(),
        }
    }
}

/// Health check endpoint
///
/// GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> MsgPack<HealthResponse> {
    // Degraded while the catalog cannot be queried
    let storage_ready = match state.catalog().stats().await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Catalog health probe failed");
            false
        }
    };

    let status = if storage_ready {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    MsgPack(HealthResponse {
        status,
        version: VERSION.to_string(),
        classifier: state.classifier().backend_name().to_string(),
        storage_ready,
        uptime_s: state.uptime_seconds(),
    })
}

/// Configuration endpoint
///
/// GET /api/v1/config
pub async fn config(State(state): State<AppState>) -> MsgPack<ConfigResponse> {
    let config = &state.config;

    MsgPack(ConfigResponse {
        classifier: ClassifierInfo {
            backend: state.classifier().backend_name().to_string(),
            model_dir: config.classifier.model_dir.display().to_string(),
            load_policy: config.classifier.load_policy.to_string(),
            max_length: config.classifier.max_length,
            cuda_enabled: config.classifier.enable_cuda,
        },
        server: ServerInfo {
            host: config.server.host.clone(),
            port: config.server.port,
        },
        storage: StorageInfo {
            backend: state.catalog().backend().to_string(),
            max_connections: config.database.max_connections,
        },
        bot_name: config.chat.bot_name.clone(),
    })
}

/// Ready message for the configured chat channel
///
/// GET /api/v1/greeting
pub async fn greeting(State(state): State<AppState>) -> MsgPack<GreetingResponse> {
    MsgPack(GreetingResponse {
        channel_id: state.config.chat.channel_id,
        message: greeting_message(&state.config.chat.bot_name),
    })
}
