//! Signed LinkedIn webhook adapter
//!
//! Verifies an HMAC-SHA256 signature over the raw request body before any
//! parsing, then dispatches on the event type. Every authenticated call
//! leaves exactly one audit entry; a rejected signature leaves none, because
//! an unauthenticated body is never processed or logged.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use pulse_common::config::SignaturePolicy;
use pulse_common::db::{AuditLogEntry, FollowUpTask, LinkedInContact, MessageLog, ProfileView};
use pulse_common::{Error, Result};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{ApiError, AppState};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "x-linkedin-signature";

const AUDIT_SOURCE: &str = "linkedin";

/// POST /api/webhook/linkedin
///
/// Takes the raw body so the signature is computed over the exact bytes the
/// producer signed, not a re-serialization.
pub async fn receive_linkedin_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(e) = verify_signature(
        state.config.webhook_secret.as_deref(),
        state.config.signature_policy,
        &headers,
        &body,
    ) {
        // No audit entry: the body is untrusted and never inspected
        return ApiError::Common(e).into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            let message = format!("Malformed JSON body: {}", e);
            state
                .store
                .record_audit(AuditLogEntry::failure(
                    AUDIT_SOURCE,
                    "unknown",
                    Value::Null,
                    &message,
                ))
                .await;
            return ApiError::BadRequest(message).into_response();
        }
    };

    let event_type = payload
        .get("eventType")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let data = payload.get("data").cloned().unwrap_or(Value::Null);

    match dispatch_event(&state, &event_type, &data).await {
        Ok(()) => {
            state
                .store
                .record_audit(AuditLogEntry::success(AUDIT_SOURCE, &event_type, payload))
                .await;
            Json(json!({
                "success": true,
                "message": "Webhook processed successfully",
                "eventType": event_type,
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

/// GET /api/webhook/linkedin/test
///
/// Unauthenticated reachability probe for wiring up the producer side.
pub async fn webhook_test() -> Json<Value> {
    Json(json!({
        "message": "LinkedIn webhook endpoint is reachable",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Check the signature header against the configured secret. With no secret
/// or no header, the policy decides: permissive processes unauthenticated,
/// require rejects.
fn verify_signature(
    secret: Option<&str>,
    policy: SignaturePolicy,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<()> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let (secret, header) = match (secret, header) {
        (Some(secret), Some(header)) => (secret, header),
        _ => {
            return match policy {
                SignaturePolicy::Permissive => {
                    warn!("Webhook signature or secret absent, processing unauthenticated");
                    Ok(())
                }
                SignaturePolicy::Require => Err(Error::Auth(
                    "Missing webhook signature".to_string(),
                )),
            };
        }
    };

    let digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| Error::Auth("Malformed signature header".to_string()))?;
    let expected =
        hex::decode(digest).map_err(|_| Error::Auth("Malformed signature header".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| Error::Auth("Invalid webhook secret".to_string()))?;
    mac.update(body);
    // verify_slice compares in constant time
    mac.verify_slice(&expected)
        .map_err(|_| Error::Auth("Invalid webhook signature".to_string()))
}

async fn dispatch_event(state: &AppState, event_type: &str, data: &Value) -> Result<()> {
    match event_type {
        "connection_request_sent" => handle_connection_request_sent(state, data).await,
        "connection_request_accepted" => handle_connection_request_accepted(state, data).await,
        "connection_request_declined" => handle_connection_request_declined(state, data).await,
        "message_sent" => handle_message_sent(state, data).await,
        "profile_view" => handle_profile_view(state, data).await,
        other => {
            // Unknown events are acknowledged and audited, never rejected,
            // so the producer does not retry them forever
            info!("Unknown webhook event type: {}", other);
            Ok(())
        }
    }
}

async fn handle_connection_request_sent(state: &AppState, data: &Value) -> Result<()> {
    let profile = data.get("recipientProfile").cloned().unwrap_or(Value::Null);
    let url = required_str(&profile, "profileUrl", "recipientProfile.profileUrl")?;

    let contact = LinkedInContact {
        id: Uuid::new_v4(),
        name: str_or(&profile, "name", "Unknown"),
        company: str_or(&profile, "company", "Unknown"),
        title: str_or(&profile, "title", "Unknown"),
        linkedin_url: Some(url),
        campaign_id: str_or(data, "campaignId", "webhook-campaign"),
        message_text: opt_str(data, "messageText"),
        status: "pending".to_string(),
        date_sent: Utc::now().date_naive(),
        accepted_at: None,
        declined_at: None,
        dataset_id: "webhook-data".to_string(),
        created_at: Utc::now(),
    };

    state.store.upsert_linkedin_contact(&contact).await
}

async fn handle_connection_request_accepted(state: &AppState, data: &Value) -> Result<()> {
    let profile = data.get("senderProfile").cloned().unwrap_or(Value::Null);
    let url = required_str(&profile, "profileUrl", "senderProfile.profileUrl")?;
    let accepted_at = timestamp_or_now(data, "acceptedAt");

    let matched = state.store.mark_connection_accepted(&url, accepted_at).await?;
    if matched == 0 {
        info!("Acceptance for unknown contact {}, nothing to update", url);
    }

    // Follow-up scheduling is best-effort, like the audit trail
    let task = FollowUpTask::thank_you(str_or(&profile, "name", "Unknown"), url);
    if let Err(e) = state.store.insert_follow_up_task(&task).await {
        warn!("Failed to schedule follow-up task: {}", e);
    }

    Ok(())
}

async fn handle_connection_request_declined(state: &AppState, data: &Value) -> Result<()> {
    let profile = data.get("senderProfile").cloned().unwrap_or(Value::Null);
    let url = required_str(&profile, "profileUrl", "senderProfile.profileUrl")?;
    let declined_at = timestamp_or_now(data, "declinedAt");

    let matched = state.store.mark_connection_declined(&url, declined_at).await?;
    if matched == 0 {
        info!("Decline for unknown contact {}, nothing to update", url);
    }
    Ok(())
}

async fn handle_message_sent(state: &AppState, data: &Value) -> Result<()> {
    let profile = data.get("recipientProfile").cloned().unwrap_or(Value::Null);
    let url = required_str(&profile, "profileUrl", "recipientProfile.profileUrl")?;

    let message = MessageLog {
        id: Uuid::new_v4(),
        recipient_name: str_or(&profile, "name", "Unknown"),
        recipient_url: url,
        message_text: str_or(data, "messageText", ""),
        conversation_id: opt_str(data, "conversationId"),
        sent_at: timestamp_or_now(data, "sentAt"),
    };

    state.store.insert_message_log(&message).await
}

async fn handle_profile_view(state: &AppState, data: &Value) -> Result<()> {
    let profile = data.get("viewedProfile").cloned().unwrap_or(Value::Null);
    let url = required_str(&profile, "profileUrl", "viewedProfile.profileUrl")?;

    let view = ProfileView {
        id: Uuid::new_v4(),
        viewed_profile_name: str_or(&profile, "name", "Unknown"),
        viewed_profile_url: url,
        viewed_at: timestamp_or_now(data, "viewedAt"),
    };

    state.store.insert_profile_view(&view).await
}

fn opt_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn str_or(value: &Value, key: &str, default: &str) -> String {
    opt_str(value, key).unwrap_or_else(|| default.to_string())
}

fn required_str(value: &Value, key: &str, field: &str) -> Result<String> {
    opt_str(value, key).ok_or_else(|| Error::Validation(format!("Missing {}", field)))
}

fn timestamp_or_now(value: &Value, key: &str) -> DateTime<Utc> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/api/webhook/linkedin", post(receive_linkedin_webhook))
        .route("/api/webhook/linkedin/test", get(webhook_test))
}
