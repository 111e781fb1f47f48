//! File-batch upload adapter and dataset management
//!
//! Accepts a parsed file (array of row objects) plus a channel, registers a
//! dataset record for the batch, then normalizes and bulk-inserts the rows.
//! The dataset record is written before the rows on purpose: a failed batch
//! leaves a visible zero-progress dataset rather than disappearing.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use pulse_common::db::{AuditLogEntry, Channel, Dataset};
use pulse_common::{Error, Result};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::normalize::{self, NormalizeContext};
use crate::{ApiError, ApiResult, AppState};

const AUDIT_SOURCE: &str = "file-upload";

/// POST /api/data/process
pub async fn process_file(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let event_type = payload
        .get("campaignType")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    match process_file_inner(&state, &payload).await {
        Ok((rows, dataset_id)) => {
            state
                .store
                .record_audit(AuditLogEntry::success(AUDIT_SOURCE, &event_type, payload))
                .await;
            Json(json!({
                "success": true,
                "message": "Data processed successfully",
                "processedRows": rows,
                "datasetId": dataset_id,
            }))
            .into_response()
        }
        Err(e) => {
            state
                .store
                .record_audit(AuditLogEntry::failure(
                    AUDIT_SOURCE,
                    &event_type,
                    payload,
                    &e.to_string(),
                ))
                .await;
            ApiError::Common(e).into_response()
        }
    }
}

async fn process_file_inner(state: &AppState, payload: &Value) -> Result<(usize, Uuid)> {
    let rows = payload
        .get("fileData")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::Validation("Missing required fields: fileData and campaignType".to_string())
        })?;
    let campaign_type = payload
        .get("campaignType")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            Error::Validation("Missing required fields: fileData and campaignType".to_string())
        })?;

    // Channel check precedes any write, so an unsupported type leaves no
    // dataset behind
    let channel: Channel = campaign_type.parse()?;

    let file_name = payload
        .get("fileName")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("untitled-import")
        .to_string();

    let dataset = Dataset::new(
        file_name,
        channel,
        rows.len() as i64,
        vec![channel.tag().to_string(), "Imported".to_string()],
    );
    state.store.insert_dataset(&dataset).await?;

    let ctx = NormalizeContext::file_upload(dataset.id.to_string(), state.config.enum_mode);

    match channel {
        Channel::Linkedin => {
            let contacts = rows
                .iter()
                .map(|row| normalize::normalize_linkedin(row, &ctx))
                .collect::<Result<Vec<_>>>()?;
            state.store.bulk_insert_linkedin(&contacts).await?;
        }
        Channel::Email => {
            let contacts = rows
                .iter()
                .map(|row| normalize::normalize_email(row, &ctx))
                .collect::<Result<Vec<_>>>()?;
            state.store.bulk_insert_email(&contacts).await?;
        }
        Channel::Webinar => {
            let attendees = rows
                .iter()
                .map(|row| normalize::normalize_webinar(row, &ctx))
                .collect::<Result<Vec<_>>>()?;
            state.store.bulk_insert_webinar(&attendees).await?;
        }
    }

    Ok((rows.len(), dataset.id))
}

/// GET /api/data/datasets
pub async fn list_datasets(State(state): State<AppState>) -> ApiResult<Json<Vec<Dataset>>> {
    Ok(Json(state.store.list_datasets().await?))
}

/// DELETE /api/data/datasets/:id
///
/// Removes the dataset record and every row imported under it.
pub async fn delete_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let removed = state.store.delete_dataset(&id).await?;
    if removed == 0 {
        return Err(ApiError::BadRequest(format!("Unknown dataset: {}", id)));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Dataset deleted successfully",
    })))
}

/// Build file-batch and dataset routes
pub fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/api/data/process", post(process_file))
        .route("/api/data/datasets", get(list_datasets))
        .route("/api/data/datasets/:id", delete(delete_dataset))
}
