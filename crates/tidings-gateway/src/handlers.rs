// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the Tidings API.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tidings_core::types::{
    InteractionKind, InteractionRecord, PipelineRequest, StylePreferences,
};
use uuid::Uuid;

use crate::envelope::{fail, ok, ok_with_warnings};
use crate::server::AppState;

/// POST /pipeline/process
///
/// Runs the full pipeline; the `PipelineRun` is returned inline. Partial
/// successes return `success=true` with the degraded stages named in
/// `warnings`.
pub async fn post_pipeline_process(
    State(state): State<AppState>,
    Json(request): Json<PipelineRequest>,
) -> Response {
    match state.orchestrator.run(request).await {
        Ok(run) => {
            let warnings = run.warnings.clone();
            ok_with_warnings(run, warnings)
        }
        Err(e) => fail(&e),
    }
}

/// Body for POST /pipeline/quick.
#[derive(Debug, Deserialize)]
pub struct QuickRequest {
    pub query: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub num_results: Option<usize>,
    #[serde(default)]
    pub max_cards: Option<usize>,
}

/// POST /pipeline/quick
///
/// Search and cards only; nothing persisted.
pub async fn post_pipeline_quick(
    State(state): State<AppState>,
    Json(request): Json<QuickRequest>,
) -> Response {
    let mut pipeline_request = PipelineRequest::quick(&request.query, &request.user_id);
    if let Some(num) = request.num_results {
        pipeline_request.num_results = num;
    }
    if let Some(cards) = request.max_cards {
        pipeline_request.max_cards = cards;
    }
    match state.orchestrator.run(pipeline_request).await {
        Ok(run) => {
            let warnings = run.warnings.clone();
            ok_with_warnings(run, warnings)
        }
        Err(e) => fail(&e),
    }
}

/// GET /pipeline/status/{run_id}
pub async fn get_pipeline_status(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    match state.orchestrator.get_run(&run_id).await {
        Ok(run) => ok(run),
        Err(e) => fail(&e),
    }
}

/// POST /chat
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<tidings_dialogue::ChatRequest>,
) -> Response {
    match state.dialogue.chat(request).await {
        Ok(response) => {
            let warnings = response.warnings.clone();
            ok_with_warnings(response, warnings)
        }
        Err(e) => fail(&e),
    }
}

/// Query parameters for GET /chat/{session_id}.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// GET /chat/{session_id}?limit=N — newest messages first.
pub async fn get_chat_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    match state
        .dialogue
        .session_messages(&session_id, query.limit)
        .await
    {
        Ok(messages) => ok(messages),
        Err(e) => fail(&e),
    }
}

/// DELETE /chat/{session_id}
pub async fn delete_chat_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.dialogue.delete_session(&session_id).await {
        Ok(()) => ok(serde_json::json!({"deleted": session_id})),
        Err(e) => fail(&e),
    }
}

/// GET /user/{id}/profile
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.memory.get_profile(&user_id).await {
        Ok(profile) => ok(profile),
        Err(e) => fail(&e),
    }
}

/// PUT /user/{id}/profile — style preference update only; derived fields
/// are owned by the memory engine.
pub async fn put_user_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(style): Json<StylePreferences>,
) -> Response {
    if !(0.0..=1.0).contains(&style.personalization_level) {
        return fail(&tidings_core::TidingsError::Config(
            "personalization_level must be in [0, 1]".into(),
        ));
    }
    match state.memory.put_style(&user_id, style).await {
        Ok(profile) => ok(profile),
        Err(e) => fail(&e),
    }
}

/// Body for POST /user/{id}/interaction.
#[derive(Debug, Deserialize)]
pub struct InteractionBody {
    pub kind: InteractionKind,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default = "default_importance")]
    pub importance: f32,
}

fn default_importance() -> f32 {
    0.5
}

/// POST /user/{id}/interaction — explicit interaction record.
pub async fn post_user_interaction(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<InteractionBody>,
) -> Response {
    let record = InteractionRecord {
        id: Uuid::new_v4().to_string(),
        user_id,
        at: Utc::now(),
        kind: body.kind,
        target: body.target,
        text: body.text,
        importance: body.importance.clamp(0.0, 1.0),
    };
    match state.memory.record(record.clone()).await {
        Ok(()) => ok(record),
        Err(e) => fail(&e),
    }
}

/// DELETE /user/{id}/memory — clears the interaction log and profile.
pub async fn delete_user_memory(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.memory.clear(&user_id).await {
        Ok(()) => ok(serde_json::json!({"cleared": user_id})),
        Err(e) => fail(&e),
    }
}

/// Per-adapter entry in the health summary.
#[derive(Debug, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub providers: Vec<ProviderHealth>,
}

/// GET /health — liveness plus per-provider reachability. Public.
pub async fn get_health(State(state): State<AppState>) -> Response {
    let mut providers = Vec::with_capacity(state.adapters.len());
    let mut degraded = false;
    for adapter in &state.adapters {
        let entry = match adapter.health_check().await {
            Ok(status) => {
                if status.as_str() != "healthy" {
                    degraded = true;
                }
                ProviderHealth {
                    name: adapter.name().to_string(),
                    status: status.as_str(),
                    reason: status.reason().map(str::to_string),
                }
            }
            Err(e) => {
                degraded = true;
                ProviderHealth {
                    name: adapter.name().to_string(),
                    status: "unhealthy",
                    reason: Some(e.to_string()),
                }
            }
        };
        providers.push(entry);
    }

    ok(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        providers,
    })
}
