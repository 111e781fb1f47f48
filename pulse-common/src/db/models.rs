//! Canonical record models
//!
//! One struct per logical collection. These are the schema-fixed shapes the
//! normalizer maps arbitrary producer records into; no source field naming
//! survives past this boundary.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Campaign data channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Linkedin,
    Email,
    Webinar,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Linkedin => "linkedin",
            Channel::Email => "email",
            Channel::Webinar => "webinar",
        }
    }

    /// Human-readable dataset tag for this channel
    pub fn tag(&self) -> &'static str {
        match self {
            Channel::Linkedin => "LinkedIn",
            Channel::Email => "Email",
            Channel::Webinar => "Webinar",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linkedin" => Ok(Channel::Linkedin),
            "email" => Ok(Channel::Email),
            "webinar" => Ok(Channel::Webinar),
            other => Err(Error::UnsupportedType(format!(
                "Unsupported campaign type: {}",
                other
            ))),
        }
    }
}

/// Connection request lifecycle states
///
/// Transitions pending -> accepted and pending -> declined are one-way.
/// In permissive enum mode other lower-cased strings may be stored verbatim,
/// so contact rows carry the status as a plain string.
pub const CONNECTION_STATUSES: &[&str] = &["pending", "accepted", "declined"];

/// Recognized RSVP states for webinar invitations
pub const RSVP_STATUSES: &[&str] = &["pending", "confirmed", "declined"];

/// LinkedIn connection contact. Identity is the profile URL; ingestion
/// upserts on it rather than appending. Batch imports may lack a URL, in
/// which case the row has no natural identity (NULL never collides with the
/// UNIQUE constraint) and is append-only.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedInContact {
    pub id: Uuid,
    pub name: String,
    pub company: String,
    pub title: String,
    pub linkedin_url: Option<String>,
    pub campaign_id: String,
    pub message_text: Option<String>,
    pub status: String,
    pub date_sent: NaiveDate,
    pub accepted_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub dataset_id: String,
    pub created_at: DateTime<Utc>,
}

/// Email campaign contact. No natural key; duplicate deliveries are
/// tolerated by design and stored append-only.
#[derive(Debug, Clone, Serialize)]
pub struct EmailContact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub campaign_name: String,
    pub date_sent: NaiveDate,
    pub opened: bool,
    pub replied: bool,
    pub dataset_id: String,
    pub created_at: DateTime<Utc>,
}

/// Webinar invitation record, append-only
#[derive(Debug, Clone, Serialize)]
pub struct WebinarAttendee {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: String,
    pub industry: String,
    pub invited_date: NaiveDate,
    pub rsvp_status: String,
    pub webinar_id: String,
    pub dataset_id: String,
    pub created_at: DateTime<Utc>,
}

/// One uploaded/imported batch. Child rows in the channel tables reference
/// it by `dataset_id`; deleting a dataset cascades to them.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub channel: Channel,
    pub row_count: i64,
    pub tags: Vec<String>,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

impl Dataset {
    /// Create a dataset record for an imported batch
    pub fn new(name: String, channel: Channel, row_count: i64, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_path: format!("processed/{}", name),
            name,
            channel,
            row_count,
            tags,
            created_at: Utc::now(),
        }
    }
}

/// Generated analysis artifact. Immutable once created; re-running the
/// engine appends a new row rather than updating an old one.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub id: Uuid,
    pub insight_type: String,
    pub title: String,
    pub summary: String,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Ingestion attempt record, one per gateway invocation. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed_at: DateTime<Utc>,
    pub status: String,
    pub error_message: Option<String>,
}

impl AuditLogEntry {
    pub fn success(source: &str, event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            event_type: event_type.to_string(),
            payload,
            processed_at: Utc::now(),
            status: "success".to_string(),
            error_message: None,
        }
    }

    pub fn failure(
        source: &str,
        event_type: &str,
        payload: serde_json::Value,
        error: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.to_string(),
            event_type: event_type.to_string(),
            payload,
            processed_at: Utc::now(),
            status: "error".to_string(),
            error_message: Some(error.to_string()),
        }
    }
}

/// Outbound message log entry (webhook `message_sent` events)
#[derive(Debug, Clone, Serialize)]
pub struct MessageLog {
    pub id: Uuid,
    pub recipient_name: String,
    pub recipient_url: String,
    pub message_text: String,
    pub conversation_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Profile view log entry (webhook `profile_view` events)
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub viewed_profile_name: String,
    pub viewed_profile_url: String,
    pub viewed_at: DateTime<Utc>,
}

/// Follow-up task scheduled when a connection request is accepted
#[derive(Debug, Clone, Serialize)]
pub struct FollowUpTask {
    pub id: Uuid,
    pub contact_name: String,
    pub contact_url: String,
    pub task_type: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: String,
}

impl FollowUpTask {
    /// Thank-you follow-up, due 24 hours after acceptance
    pub fn thank_you(contact_name: String, contact_url: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_name,
            contact_url,
            task_type: "send_thank_you_message".to_string(),
            scheduled_for: Utc::now() + chrono::Duration::hours(24),
            status: "pending".to_string(),
        }
    }
}

/// Generic per-campaign metric from the automation adapter
#[derive(Debug, Clone, Serialize)]
pub struct CampaignMetric {
    pub id: Uuid,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub metric_type: String,
    pub metric_value: Option<f64>,
    pub metric_date: NaiveDate,
    pub source: String,
    pub raw_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Catch-all record for automation payloads with no dedicated schema
#[derive(Debug, Clone, Serialize)]
pub struct RawImport {
    pub id: Uuid,
    pub data_type: String,
    pub source: String,
    pub raw_data: serde_json::Value,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_round_trip() {
        for channel in [Channel::Linkedin, Channel::Email, Channel::Webinar] {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
        assert!(matches!(
            "twitter".parse::<Channel>(),
            Err(Error::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_follow_up_scheduled_in_future() {
        let task = FollowUpTask::thank_you("A".into(), "https://example.com/a".into());
        assert!(task.scheduled_for > Utc::now());
        assert_eq!(task.status, "pending");
    }
}
