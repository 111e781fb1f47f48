//! Store writer
//!
//! All durable-store access goes through one injected handle. Conflict
//! resolution for LinkedIn contacts is delegated to SQLite's row-level
//! `ON CONFLICT` primitive; batch inserts are transactional (all-or-nothing);
//! every operation carries a bounded timeout surfaced as a distinct error
//! kind. Audit logging is best-effort and never propagates its own failure.

use chrono::{DateTime, Utc};
use pulse_common::db::{
    AuditLogEntry, CampaignMetric, Dataset, EmailContact, FollowUpTask, Insight, LinkedInContact,
    MessageLog, ProfileView, RawImport, WebinarAttendee,
};
use pulse_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Durable store access handle, created once at startup and cloned into
/// request-scoped state
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    timeout: Duration,
}

impl Store {
    pub fn new(pool: SqlitePool, timeout_ms: u64) -> Self {
        Self {
            pool,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run a store operation under the configured deadline
    pub(crate) async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    // ---- LinkedIn contacts ----

    /// Insert-or-update keyed on the profile URL. Replaying the same event
    /// updates the existing row in place; it never creates a second one.
    pub async fn upsert_linkedin_contact(&self, contact: &LinkedInContact) -> Result<()> {
        self.timed(async {
            sqlx::query(
                r#"
                INSERT INTO linkedin_contacts
                    (id, name, company, title, linkedin_url, campaign_id, message_text,
                     status, date_sent, dataset_id, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(linkedin_url) DO UPDATE SET
                    name = excluded.name,
                    company = excluded.company,
                    title = excluded.title,
                    campaign_id = excluded.campaign_id,
                    message_text = excluded.message_text,
                    status = excluded.status,
                    date_sent = excluded.date_sent,
                    dataset_id = excluded.dataset_id
                "#,
            )
            .bind(contact.id.to_string())
            .bind(&contact.name)
            .bind(&contact.company)
            .bind(&contact.title)
            .bind(&contact.linkedin_url)
            .bind(&contact.campaign_id)
            .bind(&contact.message_text)
            .bind(&contact.status)
            .bind(contact.date_sent.to_string())
            .bind(&contact.dataset_id)
            .bind(contact.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// Transition a contact to accepted. Idempotent: re-applying sets the
    /// same status again. Returns the number of matched rows.
    pub async fn mark_connection_accepted(
        &self,
        linkedin_url: &str,
        accepted_at: DateTime<Utc>,
    ) -> Result<u64> {
        self.timed(async {
            let result = sqlx::query(
                "UPDATE linkedin_contacts SET status = 'accepted', accepted_at = ?
                 WHERE linkedin_url = ?",
            )
            .bind(accepted_at.to_rfc3339())
            .bind(linkedin_url)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    /// Transition a contact to declined. Same idempotence as accepted.
    pub async fn mark_connection_declined(
        &self,
        linkedin_url: &str,
        declined_at: DateTime<Utc>,
    ) -> Result<u64> {
        self.timed(async {
            let result = sqlx::query(
                "UPDATE linkedin_contacts SET status = 'declined', declined_at = ?
                 WHERE linkedin_url = ?",
            )
            .bind(declined_at.to_rfc3339())
            .bind(linkedin_url)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        })
        .await
    }

    // ---- Bulk inserts (all-or-nothing) ----

    pub async fn bulk_insert_linkedin(&self, rows: &[LinkedInContact]) -> Result<Vec<Uuid>> {
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for contact in rows {
                sqlx::query(
                    r#"
                    INSERT INTO linkedin_contacts
                        (id, name, company, title, linkedin_url, campaign_id, message_text,
                         status, date_sent, dataset_id, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(contact.id.to_string())
                .bind(&contact.name)
                .bind(&contact.company)
                .bind(&contact.title)
                .bind(&contact.linkedin_url)
                .bind(&contact.campaign_id)
                .bind(&contact.message_text)
                .bind(&contact.status)
                .bind(contact.date_sent.to_string())
                .bind(&contact.dataset_id)
                .bind(contact.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(rows.iter().map(|c| c.id).collect())
        })
        .await
    }

    pub async fn bulk_insert_email(&self, rows: &[EmailContact]) -> Result<Vec<Uuid>> {
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for contact in rows {
                sqlx::query(
                    r#"
                    INSERT INTO email_contacts
                        (id, name, email, company, campaign_name, date_sent,
                         opened, replied, dataset_id, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(contact.id.to_string())
                .bind(&contact.name)
                .bind(&contact.email)
                .bind(&contact.company)
                .bind(&contact.campaign_name)
                .bind(contact.date_sent.to_string())
                .bind(contact.opened)
                .bind(contact.replied)
                .bind(&contact.dataset_id)
                .bind(contact.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(rows.iter().map(|c| c.id).collect())
        })
        .await
    }

    pub async fn bulk_insert_webinar(&self, rows: &[WebinarAttendee]) -> Result<Vec<Uuid>> {
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for attendee in rows {
                sqlx::query(
                    r#"
                    INSERT INTO webinar_attendees
                        (id, name, email, company, industry, invited_date,
                         rsvp_status, webinar_id, dataset_id, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(attendee.id.to_string())
                .bind(&attendee.name)
                .bind(&attendee.email)
                .bind(&attendee.company)
                .bind(&attendee.industry)
                .bind(attendee.invited_date.to_string())
                .bind(&attendee.rsvp_status)
                .bind(&attendee.webinar_id)
                .bind(&attendee.dataset_id)
                .bind(attendee.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(rows.iter().map(|a| a.id).collect())
        })
        .await
    }

    // ---- Datasets ----

    pub async fn insert_dataset(&self, dataset: &Dataset) -> Result<()> {
        let tags = serde_json::to_string(&dataset.tags).unwrap_or_else(|_| "[]".to_string());
        self.timed(async {
            sqlx::query(
                r#"
                INSERT INTO datasets (id, name, channel, row_count, tags, file_path, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(dataset.id.to_string())
            .bind(&dataset.name)
            .bind(dataset.channel.as_str())
            .bind(dataset.row_count)
            .bind(tags)
            .bind(&dataset.file_path)
            .bind(dataset.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// Datasets, newest first
    pub async fn list_datasets(&self) -> Result<Vec<Dataset>> {
        let rows = self
            .timed(async {
                sqlx::query(
                    "SELECT id, name, channel, row_count, tags, file_path, created_at
                     FROM datasets ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        rows.iter().map(dataset_from_row).collect()
    }

    /// Delete a dataset and all rows imported under it, in one transaction.
    /// Returns the number of dataset rows removed.
    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<u64> {
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for table in ["linkedin_contacts", "email_contacts", "webinar_attendees"] {
                sqlx::query(&format!("DELETE FROM {} WHERE dataset_id = ?", table))
                    .bind(dataset_id)
                    .execute(&mut *tx)
                    .await?;
            }
            let result = sqlx::query("DELETE FROM datasets WHERE id = ?")
                .bind(dataset_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(result.rows_affected())
        })
        .await
    }

    // ---- Webhook event logs ----

    pub async fn insert_message_log(&self, message: &MessageLog) -> Result<()> {
        self.timed(async {
            sqlx::query(
                r#"
                INSERT INTO linkedin_messages
                    (id, recipient_name, recipient_url, message_text, conversation_id, sent_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(message.id.to_string())
            .bind(&message.recipient_name)
            .bind(&message.recipient_url)
            .bind(&message.message_text)
            .bind(&message.conversation_id)
            .bind(message.sent_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn insert_profile_view(&self, view: &ProfileView) -> Result<()> {
        self.timed(async {
            sqlx::query(
                r#"
                INSERT INTO profile_views (id, viewed_profile_name, viewed_profile_url, viewed_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(view.id.to_string())
            .bind(&view.viewed_profile_name)
            .bind(&view.viewed_profile_url)
            .bind(view.viewed_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn insert_follow_up_task(&self, task: &FollowUpTask) -> Result<()> {
        self.timed(async {
            sqlx::query(
                r#"
                INSERT INTO follow_up_tasks
                    (id, contact_name, contact_url, task_type, scheduled_for, status)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(task.id.to_string())
            .bind(&task.contact_name)
            .bind(&task.contact_url)
            .bind(&task.task_type)
            .bind(task.scheduled_for.to_rfc3339())
            .bind(&task.status)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    // ---- Generic fallback collections ----

    pub async fn bulk_insert_campaign_metrics(
        &self,
        metrics: &[CampaignMetric],
    ) -> Result<Vec<Uuid>> {
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for metric in metrics {
                sqlx::query(
                    r#"
                    INSERT INTO campaign_metrics
                        (id, campaign_id, campaign_name, metric_type, metric_value,
                         metric_date, source, raw_data, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(metric.id.to_string())
                .bind(&metric.campaign_id)
                .bind(&metric.campaign_name)
                .bind(&metric.metric_type)
                .bind(metric.metric_value)
                .bind(metric.metric_date.to_string())
                .bind(&metric.source)
                .bind(metric.raw_data.to_string())
                .bind(metric.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(metrics.iter().map(|m| m.id).collect())
        })
        .await
    }

    pub async fn bulk_insert_raw_imports(&self, records: &[RawImport]) -> Result<Vec<Uuid>> {
        self.timed(async {
            let mut tx = self.pool.begin().await?;
            for record in records {
                sqlx::query(
                    r#"
                    INSERT INTO raw_imports (id, data_type, source, raw_data, metadata, created_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(record.id.to_string())
                .bind(&record.data_type)
                .bind(&record.source)
                .bind(record.raw_data.to_string())
                .bind(record.metadata.to_string())
                .bind(record.created_at.to_rfc3339())
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok(records.iter().map(|r| r.id).collect())
        })
        .await
    }

    // ---- Insights ----

    pub async fn insert_insight(&self, insight: &Insight) -> Result<()> {
        let recommendations =
            serde_json::to_string(&insight.recommendations).unwrap_or_else(|_| "[]".to_string());
        self.timed(async {
            sqlx::query(
                r#"
                INSERT INTO insights (id, insight_type, title, summary, recommendations, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(insight.id.to_string())
            .bind(&insight.insight_type)
            .bind(&insight.title)
            .bind(&insight.summary)
            .bind(recommendations)
            .bind(insight.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    /// Insights, newest first
    pub async fn recent_insights(&self, limit: i64) -> Result<Vec<Insight>> {
        let rows = self
            .timed(async {
                sqlx::query(
                    "SELECT id, insight_type, title, summary, recommendations, created_at
                     FROM insights ORDER BY created_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        rows.iter().map(insight_from_row).collect()
    }

    // ---- Audit log ----

    /// Best-effort audit append. A failure here is logged operationally and
    /// swallowed; it must never change the primary response path's outcome.
    pub async fn record_audit(&self, entry: AuditLogEntry) {
        let result = self
            .timed(async {
                sqlx::query(
                    r#"
                    INSERT INTO audit_log
                        (id, source, event_type, payload, processed_at, status, error_message)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(entry.id.to_string())
                .bind(&entry.source)
                .bind(&entry.event_type)
                .bind(entry.payload.to_string())
                .bind(entry.processed_at.to_rfc3339())
                .bind(&entry.status)
                .bind(&entry.error_message)
                .execute(&self.pool)
                .await?;
                Ok(())
            })
            .await;

        if let Err(e) = result {
            warn!("Failed to write audit log entry ({}): {}", entry.source, e);
        }
    }

    /// Recent audit entries for one source, newest first
    pub async fn recent_audit(&self, source: &str, limit: i64) -> Result<Vec<AuditLogEntry>> {
        let rows = self
            .timed(async {
                sqlx::query(
                    "SELECT id, source, event_type, payload, processed_at, status, error_message
                     FROM audit_log WHERE source = ?
                     ORDER BY processed_at DESC LIMIT ?",
                )
                .bind(source)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            })
            .await?;

        rows.iter().map(audit_from_row).collect()
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt stored id '{}': {}", s, e)))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt stored timestamp '{}': {}", s, e)))
}

fn dataset_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Dataset> {
    let id: String = row.get("id");
    let channel: String = row.get("channel");
    let tags: String = row.get("tags");
    let created_at: String = row.get("created_at");

    Ok(Dataset {
        id: parse_uuid(&id)?,
        name: row.get("name"),
        channel: channel.parse()?,
        row_count: row.get("row_count"),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        file_path: row.get("file_path"),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn insight_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Insight> {
    let id: String = row.get("id");
    let recommendations: String = row.get("recommendations");
    let created_at: String = row.get("created_at");

    Ok(Insight {
        id: parse_uuid(&id)?,
        insight_type: row.get("insight_type"),
        title: row.get("title"),
        summary: row.get("summary"),
        recommendations: serde_json::from_str(&recommendations).unwrap_or_default(),
        created_at: parse_timestamp(&created_at)?,
    })
}

fn audit_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<AuditLogEntry> {
    let id: String = row.get("id");
    let payload: String = row.get("payload");
    let processed_at: String = row.get("processed_at");

    Ok(AuditLogEntry {
        id: parse_uuid(&id)?,
        source: row.get("source"),
        event_type: row.get("event_type"),
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        processed_at: parse_timestamp(&processed_at)?,
        status: row.get("status"),
        error_message: row.get("error_message"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_common::db::init_memory_database;
    use pulse_common::db::Channel;

    async fn test_store() -> Store {
        let pool = init_memory_database().await.unwrap();
        Store::new(pool, 5000)
    }

    fn contact(url: &str, status: &str) -> LinkedInContact {
        LinkedInContact {
            id: Uuid::new_v4(),
            name: "A".to_string(),
            company: "B".to_string(),
            title: "C".to_string(),
            linkedin_url: Some(url.to_string()),
            campaign_id: "camp".to_string(),
            message_text: None,
            status: status.to_string(),
            date_sent: Utc::now().date_naive(),
            accepted_at: None,
            declined_at: None,
            dataset_id: "ds".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_same_url_keeps_single_row_with_latest_status() {
        let store = test_store().await;
        let url = "https://linkedin.com/in/ada";

        store.upsert_linkedin_contact(&contact(url, "pending")).await.unwrap();
        store.upsert_linkedin_contact(&contact(url, "accepted")).await.unwrap();

        let (count, status): (i64, String) = sqlx::query_as(
            "SELECT COUNT(*), MAX(status) FROM linkedin_contacts WHERE linkedin_url = ?",
        )
        .bind(url)
        .fetch_one(store.pool())
        .await
        .unwrap();

        assert_eq!(count, 1, "upsert must not create a second row");
        assert_eq!(status, "accepted");
    }

    #[tokio::test]
    async fn test_accept_transition_sets_timestamp() {
        let store = test_store().await;
        let url = "https://linkedin.com/in/grace";
        store.upsert_linkedin_contact(&contact(url, "pending")).await.unwrap();

        let matched = store
            .mark_connection_accepted(url, Utc::now())
            .await
            .unwrap();
        assert_eq!(matched, 1);

        let (status, accepted_at): (String, Option<String>) = sqlx::query_as(
            "SELECT status, accepted_at FROM linkedin_contacts WHERE linkedin_url = ?",
        )
        .bind(url)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(status, "accepted");
        assert!(accepted_at.is_some());
    }

    #[tokio::test]
    async fn test_bulk_insert_is_all_or_nothing() {
        let store = test_store().await;
        let url = "https://linkedin.com/in/dup";

        // Second row collides on the unique profile URL; the whole batch
        // must roll back
        let rows = vec![contact(url, "pending"), contact(url, "pending")];
        assert!(store.bulk_insert_linkedin(&rows).await.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM linkedin_contacts")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_delete_dataset_cascades_to_child_rows() {
        let store = test_store().await;
        let dataset = Dataset::new(
            "batch.csv".to_string(),
            Channel::Linkedin,
            1,
            vec!["LinkedIn".to_string()],
        );
        store.insert_dataset(&dataset).await.unwrap();

        let mut row = contact("https://linkedin.com/in/x", "pending");
        row.dataset_id = dataset.id.to_string();
        store.bulk_insert_linkedin(&[row]).await.unwrap();

        let removed = store.delete_dataset(&dataset.id.to_string()).await.unwrap();
        assert_eq!(removed, 1);

        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM linkedin_contacts WHERE dataset_id = ?",
        )
        .bind(dataset.id.to_string())
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(orphans, 0, "child rows must be removed with the dataset");
    }

    #[tokio::test]
    async fn test_record_audit_failure_is_swallowed() {
        let store = test_store().await;
        sqlx::query("DROP TABLE audit_log")
            .execute(store.pool())
            .await
            .unwrap();

        // Must not panic or surface an error
        store
            .record_audit(AuditLogEntry::success(
                "webhook",
                "connection_request_sent",
                serde_json::json!({}),
            ))
            .await;
    }

    #[tokio::test]
    async fn test_recent_audit_newest_first() {
        let store = test_store().await;
        for event in ["first", "second"] {
            store
                .record_audit(AuditLogEntry::success(
                    "automation",
                    event,
                    serde_json::json!({}),
                ))
                .await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let entries = store.recent_audit("automation", 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].event_type, "second");
    }
}
