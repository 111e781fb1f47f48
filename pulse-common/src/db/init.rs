//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up
//! idempotently on every start. All table creation uses
//! `CREATE TABLE IF NOT EXISTS`, so re-running against an existing database
//! is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_connection(&pool).await?;
    create_tables(&pool).await?;

    Ok(pool)
}

/// In-memory database for tests
///
/// Pool is pinned to a single connection: each SQLite `:memory:` connection
/// is its own database, so a larger pool would hand out empty databases.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

async fn configure_connection(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers while one gateway request writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all logical collections (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_datasets_table(pool).await?;
    create_linkedin_contacts_table(pool).await?;
    create_email_contacts_table(pool).await?;
    create_webinar_attendees_table(pool).await?;
    create_insights_table(pool).await?;
    create_audit_log_table(pool).await?;

    // Webhook event logs
    create_linkedin_messages_table(pool).await?;
    create_profile_views_table(pool).await?;
    create_follow_up_tasks_table(pool).await?;

    // Generic fallback collections for the automation adapter
    create_campaign_metrics_table(pool).await?;
    create_raw_imports_table(pool).await?;

    Ok(())
}

async fn create_datasets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS datasets (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            channel TEXT NOT NULL,
            row_count INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '[]',
            file_path TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_linkedin_contacts_table(pool: &SqlitePool) -> Result<()> {
    // linkedin_url is the natural identity; the UNIQUE constraint backs the
    // upsert-on-conflict primitive that prevents double-processing
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS linkedin_contacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            company TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            linkedin_url TEXT UNIQUE,
            campaign_id TEXT NOT NULL DEFAULT '',
            message_text TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            date_sent TEXT NOT NULL,
            accepted_at TEXT,
            declined_at TEXT,
            dataset_id TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_linkedin_contacts_dataset
         ON linkedin_contacts(dataset_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_email_contacts_table(pool: &SqlitePool) -> Result<()> {
    // No natural key: the email channel does not guarantee idempotent
    // delivery, so duplicates are stored as-is
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS email_contacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL,
            company TEXT NOT NULL DEFAULT '',
            campaign_name TEXT NOT NULL DEFAULT '',
            date_sent TEXT NOT NULL,
            opened INTEGER NOT NULL DEFAULT 0,
            replied INTEGER NOT NULL DEFAULT 0,
            dataset_id TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_email_contacts_dataset
         ON email_contacts(dataset_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_webinar_attendees_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webinar_attendees (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL,
            company TEXT NOT NULL DEFAULT '',
            industry TEXT NOT NULL DEFAULT 'Other',
            invited_date TEXT NOT NULL,
            rsvp_status TEXT NOT NULL DEFAULT 'pending',
            webinar_id TEXT NOT NULL DEFAULT '',
            dataset_id TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_webinar_attendees_dataset
         ON webinar_attendees(dataset_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_insights_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS insights (
            id TEXT PRIMARY KEY,
            insight_type TEXT NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            recommendations TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_audit_log_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL DEFAULT '{}',
            processed_at TEXT NOT NULL,
            status TEXT NOT NULL,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_linkedin_messages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS linkedin_messages (
            id TEXT PRIMARY KEY,
            recipient_name TEXT NOT NULL DEFAULT '',
            recipient_url TEXT NOT NULL,
            message_text TEXT NOT NULL DEFAULT '',
            conversation_id TEXT,
            sent_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_profile_views_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profile_views (
            id TEXT PRIMARY KEY,
            viewed_profile_name TEXT NOT NULL DEFAULT '',
            viewed_profile_url TEXT NOT NULL,
            viewed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_follow_up_tasks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS follow_up_tasks (
            id TEXT PRIMARY KEY,
            contact_name TEXT NOT NULL DEFAULT '',
            contact_url TEXT NOT NULL,
            task_type TEXT NOT NULL,
            scheduled_for TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_campaign_metrics_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS campaign_metrics (
            id TEXT PRIMARY KEY,
            campaign_id TEXT,
            campaign_name TEXT,
            metric_type TEXT NOT NULL DEFAULT 'general',
            metric_value REAL,
            metric_date TEXT NOT NULL,
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_raw_imports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_imports (
            id TEXT PRIMARY KEY,
            data_type TEXT NOT NULL DEFAULT 'unknown',
            source TEXT NOT NULL,
            raw_data TEXT NOT NULL DEFAULT '{}',
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_schema() {
        let pool = init_memory_database().await.expect("schema should create");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM linkedin_contacts")
            .fetch_one(&pool)
            .await
            .expect("table should exist");
        assert_eq!(count, 0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&pool)
            .await
            .expect("table should exist");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_init_database_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pulse.db");

        let pool = init_database(&path).await.expect("database should create");
        assert!(path.exists());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM datasets")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_tables(&pool).await.expect("re-run should succeed");
    }

    #[tokio::test]
    async fn test_linkedin_url_unique_constraint() {
        let pool = init_memory_database().await.unwrap();

        let insert = "INSERT INTO linkedin_contacts (id, linkedin_url, date_sent, created_at)
                      VALUES (?, ?, '2026-01-01', '2026-01-01T00:00:00Z')";

        sqlx::query(insert)
            .bind("a")
            .bind("https://linkedin.com/in/dup")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(insert)
            .bind("b")
            .bind("https://linkedin.com/in/dup")
            .execute(&pool)
            .await;
        assert!(result.is_err(), "duplicate profile URL must be rejected");
    }
}
