//! Automation callback adapter
//!
//! Generic ingestion endpoint for workflow tools. Dispatches on `dataType`;
//! `data` may be a single object or an array. The two catch-all types
//! (campaign_metrics, raw_data) tolerate a missing target table by falling
//! back to log-only processing instead of failing the call.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use pulse_common::db::{AuditLogEntry, CampaignMetric, RawImport};
use pulse_common::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::normalize::{self, NormalizeContext};
use crate::{ApiError, ApiResult, AppState};

const AUDIT_SOURCE: &str = "automation";

const SUPPORTED_TYPES: &[&str] = &[
    "linkedin_contacts",
    "email_contacts",
    "webinar_attendees",
    "campaign_metrics",
    "raw_data",
];

/// POST /api/automation/ingest
pub async fn ingest(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    let event_type = payload
        .get("dataType")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    match ingest_inner(&state, &payload).await {
        Ok((processed, inserted_ids)) => {
            state
                .store
                .record_audit(AuditLogEntry::success(AUDIT_SOURCE, &event_type, payload))
                .await;
            Json(json!({
                "success": true,
                "message": "Data processed successfully",
                "dataType": event_type,
                "processedRecords": processed,
                "insertedIds": inserted_ids,
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

async fn ingest_inner(state: &AppState, payload: &Value) -> Result<(usize, Vec<Uuid>)> {
    let data_type = payload
        .get("dataType")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            Error::Validation("Missing required fields: dataType and data".to_string())
        })?;
    let data = payload
        .get("data")
        .filter(|d| d.is_object() || d.is_array())
        .ok_or_else(|| {
            Error::Validation("Missing required fields: dataType and data".to_string())
        })?;

    let source = payload
        .get("source")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("automation")
        .to_string();
    let metadata = payload.get("metadata").cloned().unwrap_or_else(|| json!({}));

    // Single object and one-element array are equivalent
    let records: Vec<Value> = match data {
        Value::Array(items) => items.clone(),
        single => vec![single.clone()],
    };

    let ctx = NormalizeContext::automation(&metadata, state.config.enum_mode);

    let inserted_ids = match data_type {
        "linkedin_contacts" => {
            let contacts = records
                .iter()
                .map(|r| normalize::normalize_linkedin(r, &ctx))
                .collect::<Result<Vec<_>>>()?;
            state.store.bulk_insert_linkedin(&contacts).await?
        }
        "email_contacts" => {
            let contacts = records
                .iter()
                .map(|r| normalize::normalize_email(r, &ctx))
                .collect::<Result<Vec<_>>>()?;
            state.store.bulk_insert_email(&contacts).await?
        }
        "webinar_attendees" => {
            let attendees = records
                .iter()
                .map(|r| normalize::normalize_webinar(r, &ctx))
                .collect::<Result<Vec<_>>>()?;
            state.store.bulk_insert_webinar(&attendees).await?
        }
        "campaign_metrics" => {
            let metrics: Vec<CampaignMetric> = records
                .iter()
                .map(|r| campaign_metric(r, &metadata, &source))
                .collect();
            match state.store.bulk_insert_campaign_metrics(&metrics).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("Campaign metrics not persisted, logging only: {}", e);
                    Vec::new()
                }
            }
        }
        "raw_data" => {
            let imports: Vec<RawImport> = records
                .iter()
                .map(|r| raw_import(r, &metadata, &source))
                .collect();
            match state.store.bulk_insert_raw_imports(&imports).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!("Raw imports not persisted, logging only: {}", e);
                    Vec::new()
                }
            }
        }
        other => {
            return Err(Error::UnsupportedType(format!(
                "Unsupported dataType: {}. Supported types: {}",
                other,
                SUPPORTED_TYPES.join(", ")
            )));
        }
    };

    Ok((records.len(), inserted_ids))
}

fn campaign_metric(record: &Value, metadata: &Value, source: &str) -> CampaignMetric {
    let str_field = |v: &Value, key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    CampaignMetric {
        id: Uuid::new_v4(),
        campaign_id: str_field(record, "campaignId").or_else(|| str_field(metadata, "campaignId")),
        campaign_name: str_field(record, "campaignName")
            .or_else(|| str_field(metadata, "campaignName")),
        metric_type: str_field(record, "metricType").unwrap_or_else(|| "general".to_string()),
        metric_value: record
            .get("value")
            .or_else(|| record.get("metricValue"))
            .and_then(Value::as_f64),
        metric_date: str_field(record, "date")
            .or_else(|| str_field(record, "metricDate"))
            .and_then(|s| s.get(..10).map(str::to_string))
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Utc::now().date_naive()),
        source: source.to_string(),
        raw_data: record.clone(),
        created_at: Utc::now(),
    }
}

fn raw_import(record: &Value, metadata: &Value, source: &str) -> RawImport {
    RawImport {
        id: Uuid::new_v4(),
        data_type: metadata
            .get("dataType")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        source: source.to_string(),
        raw_data: record.clone(),
        metadata: metadata.clone(),
        created_at: Utc::now(),
    }
}

/// GET /api/automation/health
pub async fn automation_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "automation-ingest",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecentImportsQuery {
    limit: Option<i64>,
}

/// GET /api/automation/recent-imports?limit=
pub async fn recent_imports(
    State(state): State<AppState>,
    Query(query): Query<RecentImportsQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let imports = state.store.recent_audit(AUDIT_SOURCE, limit).await?;
    Ok(Json(json!({
        "count": imports.len(),
        "imports": imports,
    })))
}

/// Build automation callback routes
pub fn automation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/automation/ingest", post(ingest))
        .route("/api/automation/health", get(automation_health))
        .route("/api/automation/recent-imports", get(recent_imports))
}
