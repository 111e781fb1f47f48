//! Record normalization
//!
//! Maps arbitrary producer records (varying key casing and naming) into the
//! canonical record shapes. Pure and stateless: no I/O, no clock beyond
//! defaulting absent dates to today.
//!
//! Field resolution is a declarative per-field alias table consumed by one
//! generic first-non-empty-match resolver, so the whole policy is auditable
//! in one place rather than scattered through conditional chains.

use chrono::{NaiveDate, Utc};
use pulse_common::config::EnumMode;
use pulse_common::db::{
    EmailContact, LinkedInContact, WebinarAttendee, CONNECTION_STATUSES, RSVP_STATUSES,
};
use pulse_common::{Error, Result};
use serde_json::{Map, Value};
use uuid::Uuid;

// Ordered candidate source keys per canonical field. First non-empty match
// wins; order covers snake_case, camelCase, Capitalized, and
// human-readable-with-spaces variants observed across producers.
const NAME_ALIASES: &[&str] = &["name", "Name", "fullName", "full_name", "Full Name"];
const COMPANY_ALIASES: &[&str] = &["company", "Company", "companyName", "company_name"];
const TITLE_ALIASES: &[&str] = &["title", "Title", "jobTitle", "job_title", "position", "Position"];
const LINKEDIN_URL_ALIASES: &[&str] = &[
    "linkedin_url",
    "linkedinUrl",
    "LinkedIn URL",
    "profileUrl",
    "profile_url",
    "url",
];
const DATE_SENT_ALIASES: &[&str] = &["date_sent", "dateSent", "Date Sent", "sentDate", "sent_date"];
const STATUS_ALIASES: &[&str] = &["status", "Status"];
const CAMPAIGN_ID_ALIASES: &[&str] = &["campaign_id", "campaignId"];
const MESSAGE_ALIASES: &[&str] = &["message_text", "messageText", "message"];
const EMAIL_ALIASES: &[&str] = &["email", "Email", "emailAddress", "email_address"];
const CAMPAIGN_NAME_ALIASES: &[&str] = &["campaign_name", "campaignName", "Campaign Name"];
const OPENED_ALIASES: &[&str] = &["opened", "Opened", "wasOpened", "was_opened"];
const REPLIED_ALIASES: &[&str] = &["replied", "Replied", "hasReplied", "has_replied"];
const INDUSTRY_ALIASES: &[&str] = &["industry", "Industry"];
const INVITED_DATE_ALIASES: &[&str] =
    &["invited_date", "invitedDate", "Invited Date", "inviteDate"];
const RSVP_ALIASES: &[&str] = &["rsvp_status", "rsvpStatus", "RSVP Status", "status", "Status"];
const WEBINAR_ID_ALIASES: &[&str] = &["webinar_id", "webinarId"];

/// Per-adapter defaults applied when the source record omits a field
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub campaign_id: String,
    pub campaign_name: String,
    pub webinar_id: String,
    pub dataset_id: String,
    pub enum_mode: EnumMode,
}

impl NormalizeContext {
    /// Defaults for rows arriving via file-batch upload
    pub fn file_upload(dataset_id: String, enum_mode: EnumMode) -> Self {
        Self {
            campaign_id: "imported-campaign".to_string(),
            campaign_name: "Imported Campaign".to_string(),
            webinar_id: "imported-webinar".to_string(),
            dataset_id,
            enum_mode,
        }
    }

    /// Defaults for rows arriving via the automation callback; the call's
    /// metadata object may override campaign/webinar/dataset identifiers
    pub fn automation(metadata: &Value, enum_mode: EnumMode) -> Self {
        let meta = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
        };
        Self {
            campaign_id: meta("campaignId").unwrap_or_else(|| "automation-campaign".to_string()),
            campaign_name: meta("campaignName")
                .unwrap_or_else(|| "Automation Campaign".to_string()),
            webinar_id: meta("webinarId").unwrap_or_else(|| "automation-webinar".to_string()),
            dataset_id: meta("datasetId").unwrap_or_else(|| "automation-import".to_string()),
            enum_mode,
        }
    }
}

fn as_object(record: &Value) -> Result<&Map<String, Value>> {
    record
        .as_object()
        .ok_or_else(|| Error::Validation("Record must be a JSON object".to_string()))
}

/// Resolve a string field: first alias with a non-empty value wins
fn resolve(record: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        match record.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn resolve_or(record: &Map<String, Value>, aliases: &[&str], default: &str) -> String {
    resolve(record, aliases).unwrap_or_else(|| default.to_string())
}

fn resolve_required(
    record: &Map<String, Value>,
    aliases: &[&str],
    field: &str,
) -> Result<String> {
    resolve(record, aliases).ok_or_else(|| {
        Error::Validation(format!(
            "Missing required field '{}' (accepted keys: {})",
            field,
            aliases.join(", ")
        ))
    })
}

/// Truthy-cast a source value to bool. Missing and null are false; string
/// producers commonly send "false"/"0"/"no", which are treated as false too.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim().to_lowercase();
            !(s.is_empty() || s == "false" || s == "0" || s == "no")
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A boolean field is set if any alias carries a truthy value
fn resolve_bool(record: &Map<String, Value>, aliases: &[&str]) -> bool {
    aliases
        .iter()
        .filter_map(|key| record.get(*key))
        .any(truthy)
}

/// Resolve a calendar-date field; unparseable or absent values default to
/// today. Accepts plain dates and RFC 3339 timestamps (date prefix).
fn resolve_date(record: &Map<String, Value>, aliases: &[&str]) -> NaiveDate {
    resolve(record, aliases)
        .and_then(|s| parse_date(&s))
        .unwrap_or_else(|| Utc::now().date_naive())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let prefix = s.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Resolve a lifecycle-status field: lower-cased, defaulted, and validated
/// against the allowed set when the enum mode is strict. Permissive mode
/// stores unrecognized values verbatim (lower-cased).
fn resolve_enum(
    record: &Map<String, Value>,
    aliases: &[&str],
    default: &str,
    allowed: &[&str],
    mode: EnumMode,
) -> Result<String> {
    let value = resolve_or(record, aliases, default).to_lowercase();
    if mode == EnumMode::Strict && !allowed.contains(&value.as_str()) {
        return Err(Error::Validation(format!(
            "Unrecognized status '{}' (allowed: {})",
            value,
            allowed.join(", ")
        )));
    }
    Ok(value)
}

/// Normalize one record into a LinkedIn contact
pub fn normalize_linkedin(record: &Value, ctx: &NormalizeContext) -> Result<LinkedInContact> {
    let obj = as_object(record)?;

    Ok(LinkedInContact {
        id: Uuid::new_v4(),
        name: resolve_or(obj, NAME_ALIASES, "Unknown"),
        company: resolve_or(obj, COMPANY_ALIASES, "Unknown"),
        title: resolve_or(obj, TITLE_ALIASES, "Unknown"),
        linkedin_url: resolve(obj, LINKEDIN_URL_ALIASES),
        campaign_id: resolve_or(obj, CAMPAIGN_ID_ALIASES, &ctx.campaign_id),
        message_text: resolve(obj, MESSAGE_ALIASES),
        status: resolve_enum(
            obj,
            STATUS_ALIASES,
            "pending",
            CONNECTION_STATUSES,
            ctx.enum_mode,
        )?,
        date_sent: resolve_date(obj, DATE_SENT_ALIASES),
        accepted_at: None,
        declined_at: None,
        dataset_id: ctx.dataset_id.clone(),
        created_at: Utc::now(),
    })
}

/// Normalize one record into an email contact
pub fn normalize_email(record: &Value, ctx: &NormalizeContext) -> Result<EmailContact> {
    let obj = as_object(record)?;

    Ok(EmailContact {
        id: Uuid::new_v4(),
        name: resolve_or(obj, NAME_ALIASES, "Unknown"),
        email: resolve_required(obj, EMAIL_ALIASES, "email")?,
        company: resolve_or(obj, COMPANY_ALIASES, "Unknown"),
        campaign_name: resolve_or(obj, CAMPAIGN_NAME_ALIASES, &ctx.campaign_name),
        date_sent: resolve_date(obj, DATE_SENT_ALIASES),
        opened: resolve_bool(obj, OPENED_ALIASES),
        replied: resolve_bool(obj, REPLIED_ALIASES),
        dataset_id: ctx.dataset_id.clone(),
        created_at: Utc::now(),
    })
}

/// Normalize one record into a webinar attendee
pub fn normalize_webinar(record: &Value, ctx: &NormalizeContext) -> Result<WebinarAttendee> {
    let obj = as_object(record)?;

    Ok(WebinarAttendee {
        id: Uuid::new_v4(),
        name: resolve_or(obj, NAME_ALIASES, "Unknown"),
        email: resolve_required(obj, EMAIL_ALIASES, "email")?,
        company: resolve_or(obj, COMPANY_ALIASES, "Unknown"),
        industry: resolve_or(obj, INDUSTRY_ALIASES, "Other"),
        invited_date: resolve_date(obj, INVITED_DATE_ALIASES),
        rsvp_status: resolve_enum(obj, RSVP_ALIASES, "pending", RSVP_STATUSES, ctx.enum_mode)?,
        webinar_id: resolve_or(obj, WEBINAR_ID_ALIASES, &ctx.webinar_id),
        dataset_id: ctx.dataset_id.clone(),
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> NormalizeContext {
        NormalizeContext::file_upload("ds-1".to_string(), EnumMode::Permissive)
    }

    #[test]
    fn test_alias_casing_variants_all_resolve() {
        for key in ["email", "Email", "emailAddress", "email_address"] {
            let record = json!({ key: "a@example.com" });
            let contact = normalize_email(&record, &ctx()).unwrap();
            assert_eq!(contact.email, "a@example.com");
        }
    }

    #[test]
    fn test_missing_required_field_is_validation_error() {
        let record = json!({ "name": "A", "company": "B" });
        let err = normalize_email(&record, &ctx()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_first_non_empty_match_wins() {
        let record = json!({ "name": "", "Name": "Ada", "fullName": "ignored" });
        let contact = normalize_linkedin(&record, &ctx()).unwrap();
        assert_eq!(contact.name, "Ada");
    }

    #[test]
    fn test_linkedin_defaults() {
        let record = json!({ "name": "A", "company": "B" });
        let contact = normalize_linkedin(&record, &ctx()).unwrap();
        assert_eq!(contact.status, "pending");
        assert_eq!(contact.title, "Unknown");
        assert_eq!(contact.date_sent, Utc::now().date_naive());
        assert_eq!(contact.campaign_id, "imported-campaign");
        assert_eq!(contact.dataset_id, "ds-1");
        assert!(contact.linkedin_url.is_none());
        assert!(contact.message_text.is_none());
    }

    #[test]
    fn test_status_lowercased() {
        let record = json!({ "name": "A", "Status": "Accepted" });
        let contact = normalize_linkedin(&record, &ctx()).unwrap();
        assert_eq!(contact.status, "accepted");
    }

    #[test]
    fn test_permissive_enum_passes_unknown_through() {
        let record = json!({ "name": "A", "status": "Ghosted" });
        let contact = normalize_linkedin(&record, &ctx()).unwrap();
        assert_eq!(contact.status, "ghosted");
    }

    #[test]
    fn test_strict_enum_rejects_unknown() {
        let strict = NormalizeContext::file_upload("ds-1".to_string(), EnumMode::Strict);
        let record = json!({ "name": "A", "status": "Ghosted" });
        assert!(matches!(
            normalize_linkedin(&record, &strict),
            Err(Error::Validation(_))
        ));
        // Known values still pass
        let record = json!({ "name": "A", "status": "Declined" });
        assert_eq!(
            normalize_linkedin(&record, &strict).unwrap().status,
            "declined"
        );
    }

    #[test]
    fn test_boolean_truthy_cast() {
        let record = json!({
            "email": "a@example.com",
            "opened": "Yes",
            "replied": "false"
        });
        let contact = normalize_email(&record, &ctx()).unwrap();
        assert!(contact.opened);
        assert!(!contact.replied);

        let record = json!({ "email": "a@example.com", "opened": 1, "replied": 0 });
        let contact = normalize_email(&record, &ctx()).unwrap();
        assert!(contact.opened);
        assert!(!contact.replied);

        // Missing booleans default to false
        let record = json!({ "email": "a@example.com" });
        let contact = normalize_email(&record, &ctx()).unwrap();
        assert!(!contact.opened && !contact.replied);
    }

    #[test]
    fn test_boolean_falls_through_to_later_alias() {
        let record = json!({ "email": "a@example.com", "opened": false, "wasOpened": true });
        let contact = normalize_email(&record, &ctx()).unwrap();
        assert!(contact.opened);
    }

    #[test]
    fn test_webinar_defaults() {
        let record = json!({ "email": "a@example.com" });
        let attendee = normalize_webinar(&record, &ctx()).unwrap();
        assert_eq!(attendee.industry, "Other");
        assert_eq!(attendee.rsvp_status, "pending");
        assert_eq!(attendee.webinar_id, "imported-webinar");
        assert_eq!(attendee.invited_date, Utc::now().date_naive());
    }

    #[test]
    fn test_rsvp_falls_back_to_plain_status_alias() {
        let record = json!({ "email": "a@example.com", "status": "Confirmed" });
        let attendee = normalize_webinar(&record, &ctx()).unwrap();
        assert_eq!(attendee.rsvp_status, "confirmed");
    }

    #[test]
    fn test_date_parsing_accepts_rfc3339_prefix() {
        let record = json!({ "email": "a@example.com", "dateSent": "2026-03-14T09:00:00Z" });
        let contact = normalize_email(&record, &ctx()).unwrap();
        assert_eq!(
            contact.date_sent,
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
    }

    #[test]
    fn test_non_object_record_rejected() {
        let record = json!(["not", "an", "object"]);
        assert!(matches!(
            normalize_linkedin(&record, &ctx()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_automation_context_reads_metadata() {
        let metadata = json!({ "campaignId": "camp-7", "datasetId": "batch-9" });
        let ctx = NormalizeContext::automation(&metadata, EnumMode::Permissive);
        assert_eq!(ctx.campaign_id, "camp-7");
        assert_eq!(ctx.dataset_id, "batch-9");
        assert_eq!(ctx.campaign_name, "Automation Campaign");
    }
}
