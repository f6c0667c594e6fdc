/// Request handlers for the admin page and the JSON API
/// Backup work is blocking and runs on the blocking thread pool

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::AsyncReadExt;

use super::page::{render_backup_list, with_token};
use super::SharedState;
use crate::core::{BackupArtifact, BackupError, BackupManager, BackupOptions, DeleteOutcome};
use crate::utils::BACKUP_CONTENT_TYPE;

const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg),
        }
    }
}

#[derive(Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// Run a blocking manager call off the async runtime
async fn blocking<T, F>(state: &SharedState, f: F) -> Result<T, String>
where
    F: FnOnce(&BackupManager) -> Result<T, BackupError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    match tokio::task::spawn_blocking(move || f(&state.manager)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("backup task failed: {}", e)),
    }
}

// ============================================================================
// Admin Page Handlers
// ============================================================================

pub async fn admin_page(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> Html<String> {
    let backups = match blocking(&state, |m| m.list_backups()).await {
        Ok(backups) => backups,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list backups");
            state.flashes.error(format!("Error listing backups: {}", e));
            Vec::new()
        }
    };

    let flashes = state.flashes.drain();
    Html(render_backup_list(&backups, &flashes, query.token.as_deref()))
}

pub async fn create_backup_action(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> Redirect {
    let options = BackupOptions::from_settings(state.manager.settings());

    match blocking(&state, move |m| m.create_backup(&options)).await {
        Ok(_) => state.flashes.success("Backup created successfully!"),
        Err(e) => {
            tracing::error!(error = %e, "Backup failed");
            state.flashes.error(format!("Error creating backup: {}", e));
        }
    }

    Redirect::to(&with_token("/", query.token.as_deref()))
}

pub async fn delete_backup_action(
    State(state): State<SharedState>,
    Path(file): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Redirect {
    let name = file.clone();
    match blocking(&state, move |m| m.delete_backup(&name)).await {
        Ok(DeleteOutcome::Deleted) => state
            .flashes
            .success(format!("Backup {} deleted successfully!", file)),
        Ok(DeleteOutcome::NotFound) => state
            .flashes
            .warning(format!("Backup file {} not found.", file)),
        Err(e) => state.flashes.error(format!("Error deleting backup: {}", e)),
    }

    Redirect::to(&with_token("/", query.token.as_deref()))
}

/// Stream a file in fixed-size chunks
fn file_stream(file: tokio::fs::File) -> impl Stream<Item = std::io::Result<Vec<u8>>> {
    stream::unfold(Some(file), |state| async move {
        let mut file = state?;
        let mut buf = vec![0u8; DOWNLOAD_CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(file)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}

pub async fn download_backup(
    State(state): State<SharedState>,
    Path(file): Path<String>,
) -> Response {
    let Some(path) = state.manager.resolve_download(&file) else {
        return not_found();
    };

    let handle = match tokio::fs::File::open(&path).await {
        Ok(handle) => handle,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return not_found(),
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "Failed to open backup");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to open backup").into_response();
        }
    };

    let mut headers = vec![
        (header::CONTENT_TYPE, BACKUP_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.replace('"', "_")),
        ),
    ];
    if let Ok(metadata) = handle.metadata().await {
        headers.push((header::CONTENT_LENGTH, metadata.len().to_string()));
    }

    let mut response = Body::from_stream(file_stream(handle)).into_response();
    for (name, value) in headers {
        if let Ok(value) = value.parse() {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

// ============================================================================
// JSON API Handlers
// ============================================================================

pub async fn list_backups(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<Vec<BackupArtifact>>>, StatusCode> {
    let backups = blocking(&state, |m| m.list_backups())
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(ApiResponse::ok(backups)))
}

pub async fn create_backup(
    State(state): State<SharedState>,
) -> (StatusCode, Json<ApiResponse<BackupArtifact>>) {
    let options = BackupOptions::from_settings(state.manager.settings());

    match blocking(&state, move |m| m.create_backup(&options)).await {
        Ok(artifact) => (StatusCode::OK, Json(ApiResponse::ok(artifact))),
        Err(e) => {
            tracing::error!(error = %e, "Backup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Error creating backup: {}", e))),
            )
        }
    }
}

pub async fn delete_backup(
    State(state): State<SharedState>,
    Path(file): Path<String>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    let name = file.clone();
    match blocking(&state, move |m| m.delete_backup(&name)).await {
        Ok(DeleteOutcome::Deleted) => (
            StatusCode::OK,
            Json(ApiResponse::ok(format!("Backup {} deleted", file))),
        ),
        Ok(DeleteOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Backup file {} not found", file))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Error deleting backup: {}", e))),
        ),
    }
}

pub async fn get_config(
    State(state): State<SharedState>,
) -> Json<ApiResponse<BTreeMap<String, String>>> {
    Json(ApiResponse::ok(state.manager.settings().to_map()))
}

pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok("healthy".to_string()))
}
