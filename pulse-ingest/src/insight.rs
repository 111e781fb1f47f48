//! Insight engine
//!
//! Deterministic threshold rules over aggregate rates. No learned model:
//! a fixed rule table accumulates recommendations, with a single fallback
//! when nothing fires. Insights are append-only; re-running with identical
//! input produces a new record.

use chrono::Utc;
use pulse_common::db::Insight;
use pulse_common::Result;
use uuid::Uuid;

use crate::aggregate::{self, EmailStats, LinkedInStats};
use crate::store::Store;

/// Lookback window for on-demand generation
pub const ON_DEMAND_LOOKBACK_DAYS: i64 = 7;
/// Lookback window for the scheduled daily job
pub const DAILY_LOOKBACK_HOURS: i64 = 24;

/// Apply the fixed rule table. Rules accumulate: several may fire on the
/// same run. Only the fallback is exclusive, replacing an empty list.
pub fn build_recommendations(linkedin: &LinkedInStats, email: &EmailStats) -> Vec<String> {
    let mut recommendations = Vec::new();

    if linkedin.acceptance_rate < 20.0 {
        recommendations.push(
            "LinkedIn acceptance rate is below industry average - personalize connection \
             messages to lift responses."
                .to_string(),
        );
    } else if linkedin.acceptance_rate > 30.0 {
        recommendations
            .push("Excellent LinkedIn performance - scale up outreach efforts.".to_string());
    }

    if email.open_rate < 25.0 {
        recommendations
            .push("Email open rates could be improved - A/B test subject lines.".to_string());
    } else if email.open_rate > 35.0 {
        recommendations.push(
            "Great email engagement - increase send frequency to capitalize on it.".to_string(),
        );
    }

    if email.reply_rate > 10.0 {
        recommendations.push(
            "High email reply rate indicates strong message relevance - reuse messaging \
             strategy for future campaigns."
                .to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations.push("Continue current strategy - performance is stable.".to_string());
    }

    recommendations
}

/// Assemble an Insight record from aggregate stats
pub fn build_insight(
    insight_type: &str,
    linkedin: &LinkedInStats,
    email: &EmailStats,
) -> Insight {
    let title = match insight_type {
        "daily" => "Daily Performance Summary".to_string(),
        other => format!("{} Performance Analysis", capitalize(other)),
    };

    let summary = format!(
        "{} performance summary: {} LinkedIn requests sent with {:.1}% acceptance rate. \
         {} emails sent with {:.1}% open rate and {:.1}% reply rate.",
        capitalize(insight_type),
        linkedin.total_sent,
        linkedin.acceptance_rate,
        email.total_sent,
        email.open_rate,
        email.reply_rate,
    );

    Insight {
        id: Uuid::new_v4(),
        insight_type: insight_type.to_string(),
        title,
        summary,
        recommendations: build_recommendations(linkedin, email),
        created_at: Utc::now(),
    }
}

/// Aggregate the lookback window, build the insight, and persist it
pub async fn generate_insight(
    store: &Store,
    insight_type: &str,
    lookback: chrono::Duration,
) -> Result<Insight> {
    let since = Utc::now() - lookback;

    let linkedin = aggregate::linkedin_stats(store, Some(since)).await?;
    let email = aggregate::email_stats(store, Some(since)).await?;

    let insight = build_insight(insight_type, &linkedin, &email);
    store.insert_insight(&insight).await?;

    Ok(insight)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
