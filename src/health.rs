use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::config::env_presence;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DebugResponse {
    pub store_initialized: bool,
    pub store_connection_ok: bool,
    pub store_error: Option<String>,
    /// Presence of each configuration variable; values are never reported.
    pub env_vars: BTreeMap<String, bool>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/debug",
    tag = "health",
    responses(
        (status = 200, description = "Store connectivity and configuration presence", body = DebugResponse)
    )
)]
pub async fn debug(State(state): State<AppState>) -> Json<DebugResponse> {
    let (store_initialized, store_connection_ok, store_error) = match &state.repository {
        Some(repository) => match repository.ping().await {
            Ok(()) => {
                info!("Document store ping succeeded");
                (true, true, None)
            }
            Err(e) => {
                error!("Document store ping failed: {}", e);
                (true, false, Some(e.to_string()))
            }
        },
        None => (
            false,
            false,
            Some("no document store in this process".to_string()),
        ),
    };

    let env_vars = env_presence()
        .into_iter()
        .map(|(name, present)| (name.to_string(), present))
        .collect();

    Json(DebugResponse {
        store_initialized,
        store_connection_ok,
        store_error,
        env_vars,
    })
}
