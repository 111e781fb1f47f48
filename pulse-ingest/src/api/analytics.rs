//! Analytics read endpoints
//!
//! Read-only views over the canonical records plus on-demand insight
//! generation. All aggregation happens at read time; nothing here mutates
//! channel tables.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use pulse_common::db::Insight;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::aggregate::{self, CampaignPerformance, TrendPoint};
use crate::insight::{self, ON_DEMAND_LOOKBACK_DAYS};
use crate::{ApiResult, AppState};

/// GET /api/analytics/dashboard
///
/// Combined all-time stats for the three channels plus the five most recent
/// insights.
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let linkedin = aggregate::linkedin_stats(&state.store, None).await?;
    let email = aggregate::email_stats(&state.store, None).await?;
    let webinar = aggregate::webinar_stats(&state.store, None).await?;
    let insights = state.store.recent_insights(5).await?;

    Ok(Json(json!({
        "linkedin": linkedin,
        "email": email,
        "webinar": webinar,
        "insights": insights,
        "lastUpdated": Utc::now().to_rfc3339(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    timeframe: Option<String>,
}

/// GET /api/analytics/linkedin/trends?timeframe=7d|30d|90d
pub async fn linkedin_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> ApiResult<Json<Vec<TrendPoint>>> {
    // Unrecognized timeframes get the widest window rather than an error
    let days = match query.timeframe.as_deref().unwrap_or("30d") {
        "7d" => 7,
        "30d" => 30,
        _ => 90,
    };
    Ok(Json(aggregate::linkedin_trends(&state.store, days).await?))
}

/// GET /api/analytics/email/performance
pub async fn email_performance(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CampaignPerformance>>> {
    Ok(Json(aggregate::email_campaign_performance(&state.store).await?))
}

/// POST /api/analytics/insights/generate
///
/// On-demand insight over the trailing seven days. The body's `type` labels
/// the insight; it defaults to "weekly".
pub async fn generate_insight(
    State(state): State<AppState>,
    payload: Option<Json<Value>>,
) -> ApiResult<Json<Insight>> {
    let insight_type = payload
        .as_ref()
        .and_then(|Json(p)| p.get("type"))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("weekly")
        .to_string();

    let insight = insight::generate_insight(
        &state.store,
        &insight_type,
        chrono::Duration::days(ON_DEMAND_LOOKBACK_DAYS),
    )
    .await?;

    Ok(Json(insight))
}

/// Build analytics routes
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/api/analytics/dashboard", get(dashboard))
        .route("/api/analytics/linkedin/trends", get(linkedin_trends))
        .route("/api/analytics/email/performance", get(email_performance))
        .route("/api/analytics/insights/generate", post(generate_insight))
}
