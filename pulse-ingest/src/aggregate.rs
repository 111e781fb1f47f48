//! Aggregation over canonical records
//!
//! Per-channel statistics, calendar-day trend series, and per-campaign
//! rollups. Every rate is guarded: zero records means rate 0, never NaN.

use chrono::{DateTime, NaiveDate, Utc};
use pulse_common::Result;
use serde::Serialize;
use std::collections::HashMap;

use crate::store::Store;

/// Percentage with division-by-zero guard
pub fn pct(part: i64, total: i64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInStats {
    pub total_sent: i64,
    pub accepted: i64,
    pub pending: i64,
    pub declined: i64,
    pub acceptance_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailStats {
    pub total_sent: i64,
    pub opened: i64,
    pub replied: i64,
    pub open_rate: f64,
    pub reply_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebinarStats {
    pub total_invited: i64,
    pub confirmed: i64,
    pub pending: i64,
    pub declined: i64,
    pub rsvp_rate: f64,
}

/// One calendar-day bucket in a trend series
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub sent: i64,
    pub accepted: i64,
    pub acceptance_rate: f64,
}

/// Per-campaign email rollup
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPerformance {
    pub name: String,
    pub sent: i64,
    pub opened: i64,
    pub replied: i64,
    pub open_rate: f64,
    pub reply_rate: f64,
}

/// LinkedIn channel statistics, optionally restricted to records created
/// after `since`
pub async fn linkedin_stats(store: &Store, since: Option<DateTime<Utc>>) -> Result<LinkedInStats> {
    let mut sql = String::from(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'accepted' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'declined' THEN 1 ELSE 0 END), 0)
         FROM linkedin_contacts",
    );
    if since.is_some() {
        sql.push_str(" WHERE created_at >= ?");
    }

    let mut query = sqlx::query_as::<_, (i64, i64, i64, i64)>(&sql);
    if let Some(since) = since {
        query = query.bind(since.to_rfc3339());
    }

    let (total, accepted, pending, declined) =
        store.timed(query.fetch_one(store.pool())).await?;

    Ok(LinkedInStats {
        total_sent: total,
        accepted,
        pending,
        declined,
        acceptance_rate: pct(accepted, total),
    })
}

/// Email channel statistics
pub async fn email_stats(store: &Store, since: Option<DateTime<Utc>>) -> Result<EmailStats> {
    let mut sql = String::from(
        "SELECT COUNT(*),
                COALESCE(SUM(opened), 0),
                COALESCE(SUM(replied), 0)
         FROM email_contacts",
    );
    if since.is_some() {
        sql.push_str(" WHERE created_at >= ?");
    }

    let mut query = sqlx::query_as::<_, (i64, i64, i64)>(&sql);
    if let Some(since) = since {
        query = query.bind(since.to_rfc3339());
    }

    let (total, opened, replied) = store.timed(query.fetch_one(store.pool())).await?;

    Ok(EmailStats {
        total_sent: total,
        opened,
        replied,
        open_rate: pct(opened, total),
        reply_rate: pct(replied, total),
    })
}

/// Webinar channel statistics
pub async fn webinar_stats(store: &Store, since: Option<DateTime<Utc>>) -> Result<WebinarStats> {
    let mut sql = String::from(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN rsvp_status = 'confirmed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN rsvp_status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN rsvp_status = 'declined' THEN 1 ELSE 0 END), 0)
         FROM webinar_attendees",
    );
    if since.is_some() {
        sql.push_str(" WHERE created_at >= ?");
    }

    let mut query = sqlx::query_as::<_, (i64, i64, i64, i64)>(&sql);
    if let Some(since) = since {
        query = query.bind(since.to_rfc3339());
    }

    let (total, confirmed, pending, declined) =
        store.timed(query.fetch_one(store.pool())).await?;

    Ok(WebinarStats {
        total_invited: total,
        confirmed,
        pending,
        declined,
        rsvp_rate: pct(confirmed, total),
    })
}

/// LinkedIn trend series over the trailing `days` calendar days
///
/// Always returns exactly `days` buckets, oldest first. A record falls into
/// a bucket when its send date equals the bucket's date or its creation
/// timestamp lands on that day; empty days report zero counts and rate 0.
pub async fn linkedin_trends(store: &Store, days: u32) -> Result<Vec<TrendPoint>> {
    let start = Utc::now() - chrono::Duration::days(days as i64);
    let rows: Vec<(String, String, String)> = store
        .timed(
            sqlx::query_as(
                "SELECT status, date_sent, created_at FROM linkedin_contacts
                 WHERE created_at >= ?",
            )
            .bind(start.to_rfc3339())
            .fetch_all(store.pool()),
        )
        .await?;

    let today = Utc::now().date_naive();
    let mut points = Vec::with_capacity(days as usize);

    for offset in (0..days as i64).rev() {
        let day = today - chrono::Duration::days(offset);
        let day_str = day.to_string();

        let mut sent = 0i64;
        let mut accepted = 0i64;
        for (status, date_sent, created_at) in &rows {
            if date_sent == &day_str || created_at.starts_with(&day_str) {
                sent += 1;
                if status == "accepted" {
                    accepted += 1;
                }
            }
        }

        points.push(TrendPoint {
            date: day,
            sent,
            accepted,
            acceptance_rate: pct(accepted, sent),
        });
    }

    Ok(points)
}

/// Per-campaign email performance, grouped by campaign name. Rows without
/// a campaign name land under "Default Campaign". Order is unspecified.
pub async fn email_campaign_performance(store: &Store) -> Result<Vec<CampaignPerformance>> {
    let rows: Vec<(String, bool, bool)> = store
        .timed(
            sqlx::query_as("SELECT campaign_name, opened, replied FROM email_contacts")
                .fetch_all(store.pool()),
        )
        .await?;

    let mut campaigns: HashMap<String, (i64, i64, i64)> = HashMap::new();
    for (name, opened, replied) in rows {
        let name = if name.trim().is_empty() {
            "Default Campaign".to_string()
        } else {
            name
        };
        let entry = campaigns.entry(name).or_insert((0, 0, 0));
        entry.0 += 1;
        if opened {
            entry.1 += 1;
        }
        if replied {
            entry.2 += 1;
        }
    }

    Ok(campaigns
        .into_iter()
        .map(|(name, (sent, opened, replied))| CampaignPerformance {
            name,
            sent,
            opened,
            replied,
            open_rate: pct(opened, sent),
            reply_rate: pct(replied, sent),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_common::db::init_memory_database;

    async fn test_store() -> Store {
        let pool = init_memory_database().await.unwrap();
        Store::new(pool, 5000)
    }

    #[test]
    fn test_pct_zero_guard() {
        assert_eq!(pct(0, 0), 0.0);
        assert_eq!(pct(5, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
        assert!(pct(0, 0).is_finite());
    }

    #[tokio::test]
    async fn test_stats_on_empty_store_are_all_zero() {
        let store = test_store().await;

        let li = linkedin_stats(&store, None).await.unwrap();
        assert_eq!(li.total_sent, 0);
        assert_eq!(li.acceptance_rate, 0.0);

        let em = email_stats(&store, None).await.unwrap();
        assert_eq!(em.open_rate, 0.0);
        assert_eq!(em.reply_rate, 0.0);

        let wb = webinar_stats(&store, None).await.unwrap();
        assert_eq!(wb.rsvp_rate, 0.0);
    }

    #[tokio::test]
    async fn test_trends_always_return_exactly_n_buckets() {
        let store = test_store().await;

        for days in [7u32, 30, 90] {
            let points = linkedin_trends(&store, days).await.unwrap();
            assert_eq!(points.len(), days as usize);
            assert!(points.iter().all(|p| p.sent == 0 && p.acceptance_rate == 0.0));
        }
    }

    #[tokio::test]
    async fn test_trend_buckets_match_send_date() {
        let store = test_store().await;
        let today = Utc::now().date_naive();

        sqlx::query(
            "INSERT INTO linkedin_contacts (id, linkedin_url, status, date_sent, created_at)
             VALUES ('a', 'u1', 'accepted', ?, ?),
                    ('b', 'u2', 'pending', ?, ?)",
        )
        .bind(today.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(today.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(store.pool())
        .await
        .unwrap();

        let points = linkedin_trends(&store, 7).await.unwrap();
        let last = points.last().unwrap();
        assert_eq!(last.date, today);
        assert_eq!(last.sent, 2);
        assert_eq!(last.accepted, 1);
        assert_eq!(last.acceptance_rate, 50.0);
    }

    #[tokio::test]
    async fn test_campaign_performance_groups_and_defaults() {
        let store = test_store().await;

        sqlx::query(
            "INSERT INTO email_contacts (id, email, campaign_name, date_sent, opened, replied, created_at)
             VALUES ('a', 'a@x.com', 'Launch', '2026-08-01', 1, 0, '2026-08-01T00:00:00+00:00'),
                    ('b', 'b@x.com', 'Launch', '2026-08-01', 1, 1, '2026-08-01T00:00:00+00:00'),
                    ('c', 'c@x.com', '', '2026-08-01', 0, 0, '2026-08-01T00:00:00+00:00')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let mut performance = email_campaign_performance(&store).await.unwrap();
        performance.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(performance.len(), 2);
        assert_eq!(performance[0].name, "Default Campaign");
        assert_eq!(performance[0].sent, 1);
        assert_eq!(performance[1].name, "Launch");
        assert_eq!(performance[1].open_rate, 100.0);
        assert_eq!(performance[1].reply_rate, 50.0);
    }
}
