// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the archive REST API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use chatvault_core::types::{ArchiveStats, ChatRecord, MessageRecord, TaskRecord, TaskType};
use chatvault_core::ChatvaultError;
use chatvault_storage::queries::{chats, edits, messages, stats, tasks};
use chatvault_storage::queries::messages::MessageQuery;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// [`ChatvaultError`] mapped onto an HTTP status.
pub struct ApiError(ChatvaultError);

impl From<ChatvaultError> for ApiError {
    fn from(e: ChatvaultError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChatvaultError::ChatNotFound { .. } | ChatvaultError::TaskNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ChatvaultError::Config(_) | ChatvaultError::MalformedMessage { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Request body for `POST /tasks`.
#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct TaskSubmitted {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct QueueStateResponse {
    pub size: i64,
    pub is_processing: bool,
    pub is_halted: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: i64,
}

/// GET /health (public).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /tasks
pub async fn post_tasks(
    State(state): State<GatewayState>,
    Json(body): Json<TaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let params = if body.params.is_null() {
        serde_json::json!({})
    } else {
        body.params
    };
    let task_id = state.queue.submit(body.task_type, body.chat_id, params).await?;
    Ok((StatusCode::ACCEPTED, Json(TaskSubmitted { task_id })))
}

#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    #[serde(default = "default_task_limit")]
    pub limit: i64,
}

fn default_task_limit() -> i64 {
    50
}

/// GET /tasks
pub async fn get_tasks(
    State(state): State<GatewayState>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Vec<TaskRecord>>, ApiError> {
    Ok(Json(tasks::list_tasks(&state.db, params.limit).await?))
}

/// GET /tasks/{id}
pub async fn get_task(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<TaskRecord>, ApiError> {
    let task = tasks::get_task(&state.db, &id)
        .await?
        .ok_or(ChatvaultError::TaskNotFound { id })?;
    Ok(Json(task))
}

/// GET /queue
pub async fn get_queue(
    State(state): State<GatewayState>,
) -> Result<Json<QueueStateResponse>, ApiError> {
    let (size, is_processing) = state.queue.queue_state().await?;
    Ok(Json(QueueStateResponse {
        size,
        is_processing,
        is_halted: state.queue.is_halted(),
    }))
}

/// GET /chats
pub async fn get_chats(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<ChatRecord>>, ApiError> {
    Ok(Json(chats::list_chats(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct MessageListParams {
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default = "default_message_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
}

fn default_message_limit() -> i64 {
    100
}

/// GET /messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    Query(params): Query<MessageListParams>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    let query = MessageQuery {
        chat_id: params.chat_id,
        limit: params.limit,
        offset: params.offset,
        search: params.search,
        include_deleted: params.include_deleted,
    };
    Ok(Json(messages::get_messages(&state.db, query).await?))
}

/// GET /messages/{chat_id}/{message_id}
pub async fn get_message(
    State(state): State<GatewayState>,
    Path((chat_id, message_id)): Path<(i64, i64)>,
) -> Result<Json<MessageRecord>, Response> {
    match messages::get_message(&state.db, chat_id, message_id).await {
        Ok(Some(message)) => Ok(Json(message)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("message {message_id} not found in chat {chat_id}"),
            }),
        )
            .into_response()),
        Err(e) => Err(ApiError(e).into_response()),
    }
}

/// GET /edits/{chat_id}/{message_id}
pub async fn get_edits(
    State(state): State<GatewayState>,
    Path((chat_id, message_id)): Path<(i64, i64)>,
) -> Result<Json<Vec<chatvault_core::types::EditRecord>>, ApiError> {
    Ok(Json(edits::list_edits(&state.db, chat_id, message_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeletedListParams {
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default = "default_message_limit")]
    pub limit: i64,
}

/// GET /deleted
pub async fn get_deleted(
    State(state): State<GatewayState>,
    Query(params): Query<DeletedListParams>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    Ok(Json(
        edits::list_deleted(&state.db, params.chat_id, params.limit).await?,
    ))
}

/// GET /stats
pub async fn get_stats(
    State(state): State<GatewayState>,
) -> Result<Json<ArchiveStats>, ApiError> {
    Ok(Json(stats::stats(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub chat_id: i64,
    #[serde(default = "default_export_limit")]
    pub limit: i64,
}

fn default_export_limit() -> i64 {
    1000
}

/// GET /export
pub async fn get_export(
    State(state): State<GatewayState>,
    Query(params): Query<ExportParams>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    Ok(Json(
        messages::export_chat(&state.db, params.chat_id, params.limit).await?,
    ))
}

/// DELETE /chats/{chat_id}/messages
pub async fn delete_chat_messages(
    State(state): State<GatewayState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = chats::clear_chat(&state.db, chat_id).await?;
    tracing::info!(chat_id, deleted, "chat archive cleared");
    Ok(Json(DeletedResponse { deleted }))
}

/// DELETE /messages (full purge)
pub async fn delete_all_messages(
    State(state): State<GatewayState>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = chats::clear_all(&state.db).await?;
    tracing::warn!(deleted, "full archive purge");
    Ok(Json(DeletedResponse { deleted }))
}
