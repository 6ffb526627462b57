//! Issue records and the loosely-typed payloads that create and mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::timestamp;
use crate::truthy::json_truthy;

/// A stored issue record.
///
/// Field names and the `_id` key are the wire contract; timestamps always
/// render in the canonical millisecond form. Field order matches the shape
/// historical documents were written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "_id")]
    pub id: String,
    pub issue_title: String,
    pub issue_text: String,
    #[serde(with = "timestamp::iso_millis")]
    pub created_on: DateTime<Utc>,
    #[serde(with = "timestamp::iso_millis")]
    pub updated_on: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub assigned_to: String,
    pub open: bool,
    #[serde(default)]
    pub status_text: String,
}

impl Issue {
    /// Merge an update patch into this issue, stamping `updated_on`.
    ///
    /// Text fields replace only when submitted non-empty; otherwise the
    /// prior value is retained. `open` is close-only: a truthy `open` in the
    /// patch closes the issue, anything else leaves the stored value alone.
    /// `_id` and `created_on` never change.
    pub fn apply_patch(&self, patch: &IssuePatch, now: DateTime<Utc>) -> Issue {
        Issue {
            id: self.id.clone(),
            issue_title: pick(&patch.issue_title, &self.issue_title),
            issue_text: pick(&patch.issue_text, &self.issue_text),
            created_on: self.created_on,
            updated_on: now,
            created_by: pick(&patch.created_by, &self.created_by),
            assigned_to: pick(&patch.assigned_to, &self.assigned_to),
            open: if patch.wants_close() { false } else { self.open },
            status_text: pick(&patch.status_text, &self.status_text),
        }
    }
}

fn pick(candidate: &Option<String>, prior: &str) -> String {
    match candidate.as_deref() {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => prior.to_string(),
    }
}

/// Generate a fresh issue id: 32 lowercase hex characters.
pub fn new_issue_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Creation payload, as submitted by a client.
///
/// Unknown keys are ignored; absent and empty fields are distinguishable
/// from present ones so validation can mirror the presence rules clients
/// were written against.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueDraft {
    #[serde(default)]
    pub issue_title: Option<String>,
    #[serde(default)]
    pub issue_text: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
}

impl IssueDraft {
    /// Whether `issue_title`, `issue_text`, and `created_by` are all
    /// submitted non-empty.
    pub fn has_required_fields(&self) -> bool {
        [&self.issue_title, &self.issue_text, &self.created_by]
            .iter()
            .all(|field| field.as_deref().is_some_and(|value| !value.is_empty()))
    }

    /// Build the stored record for this draft.
    ///
    /// Optional fields default to the empty string, `open` starts true, and
    /// both timestamps start at `now`. Callers validate with
    /// [`IssueDraft::has_required_fields`] first; the conversion itself is
    /// total and falls back to empty strings.
    pub fn into_issue(self, id: String, now: DateTime<Utc>) -> Issue {
        Issue {
            id,
            issue_title: self.issue_title.unwrap_or_default(),
            issue_text: self.issue_text.unwrap_or_default(),
            created_on: now,
            updated_on: now,
            created_by: self.created_by.unwrap_or_default(),
            assigned_to: self.assigned_to.unwrap_or_default(),
            open: true,
            status_text: self.status_text.unwrap_or_default(),
        }
    }
}

/// Update payload, as submitted by a client.
///
/// The five text fields are typed; `open` stays a raw JSON value because
/// clients send it as a boolean, a string, or not at all, and only its
/// truthiness matters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssuePatch {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub issue_title: Option<String>,
    #[serde(default)]
    pub issue_text: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub open: Value,
}

impl IssuePatch {
    /// The submitted `_id`, treating an empty string as absent.
    pub fn submitted_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Whether the patch carries at least one usable update field.
    ///
    /// A text field counts only when non-empty; `open` counts only when
    /// truthy. A patch of empty strings is "no update field(s) sent".
    pub fn has_update_fields(&self) -> bool {
        let text_sent = [
            &self.issue_title,
            &self.issue_text,
            &self.created_by,
            &self.assigned_to,
            &self.status_text,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|value| !value.is_empty()));
        text_sent || json_truthy(&self.open)
    }

    /// Whether the patch asks to close the issue.
    pub fn wants_close(&self) -> bool {
        json_truthy(&self.open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 8, 6, 35, 14)
            .single()
            .expect("fixed time")
            + Duration::milliseconds(240)
    }

    fn later_time() -> DateTime<Utc> {
        fixed_time() + Duration::seconds(90)
    }

    fn sample_issue() -> Issue {
        Issue {
            id: "5871dda29faedc3491ff93bb".to_string(),
            issue_title: "Fix error in posting data".to_string(),
            issue_text: "When we post data it has an error.".to_string(),
            created_on: fixed_time(),
            updated_on: fixed_time(),
            created_by: "Joe".to_string(),
            assigned_to: "Joe".to_string(),
            open: true,
            status_text: "In QA".to_string(),
        }
    }

    #[test]
    fn issue_serializes_with_wire_field_names() {
        let value = serde_json::to_value(sample_issue()).expect("issue should serialize");
        assert_eq!(
            value,
            json!({
                "_id": "5871dda29faedc3491ff93bb",
                "issue_title": "Fix error in posting data",
                "issue_text": "When we post data it has an error.",
                "created_on": "2017-01-08T06:35:14.240Z",
                "updated_on": "2017-01-08T06:35:14.240Z",
                "created_by": "Joe",
                "assigned_to": "Joe",
                "open": true,
                "status_text": "In QA",
            })
        );
    }

    #[test]
    fn issue_round_trips_through_json() {
        let issue = sample_issue();
        let encoded = serde_json::to_string(&issue).expect("issue should serialize");
        let decoded: Issue = serde_json::from_str(&encoded).expect("issue should deserialize");
        assert_eq!(decoded, issue);
    }

    #[test]
    fn apply_patch_replaces_only_submitted_fields() {
        let patch = IssuePatch {
            issue_text: Some("New text.".to_string()),
            ..IssuePatch::default()
        };
        let updated = sample_issue().apply_patch(&patch, later_time());

        assert_eq!(updated.issue_text, "New text.");
        assert_eq!(updated.issue_title, "Fix error in posting data");
        assert_eq!(updated.created_by, "Joe");
        assert_eq!(updated.created_on, fixed_time());
        assert_eq!(updated.updated_on, later_time());
        assert!(updated.open);
    }

    #[test]
    fn apply_patch_treats_empty_strings_as_not_submitted() {
        let patch = IssuePatch {
            issue_title: Some(String::new()),
            assigned_to: Some("Maya".to_string()),
            ..IssuePatch::default()
        };
        let updated = sample_issue().apply_patch(&patch, later_time());

        assert_eq!(updated.issue_title, "Fix error in posting data");
        assert_eq!(updated.assigned_to, "Maya");
    }

    #[test]
    fn apply_patch_open_is_close_only() {
        let closing = IssuePatch {
            open: json!(true),
            ..IssuePatch::default()
        };
        let closed = sample_issue().apply_patch(&closing, later_time());
        assert!(!closed.open);

        // Falsy `open` never reopens and never flips anything.
        let reopening = IssuePatch {
            issue_text: Some("still broken".to_string()),
            open: json!(false),
            ..IssuePatch::default()
        };
        let still_closed = closed.apply_patch(&reopening, later_time());
        assert!(!still_closed.open);

        let untouched = sample_issue().apply_patch(&reopening, later_time());
        assert!(untouched.open);
    }

    #[test]
    fn apply_patch_accepts_string_open_values() {
        let closing = IssuePatch {
            open: json!("false"),
            ..IssuePatch::default()
        };
        // Any non-empty string is truthy, so even "false" closes.
        let closed = sample_issue().apply_patch(&closing, later_time());
        assert!(!closed.open);
    }

    #[test]
    fn draft_requires_title_text_and_author() {
        let complete = IssueDraft {
            issue_title: Some("Title".to_string()),
            issue_text: Some("Text".to_string()),
            created_by: Some("Functional Test".to_string()),
            ..IssueDraft::default()
        };
        assert!(complete.has_required_fields());

        let missing = IssueDraft {
            issue_title: Some("Title".to_string()),
            ..IssueDraft::default()
        };
        assert!(!missing.has_required_fields());

        let empty = IssueDraft {
            issue_title: Some("Title".to_string()),
            issue_text: Some(String::new()),
            created_by: Some("Functional Test".to_string()),
            ..IssueDraft::default()
        };
        assert!(!empty.has_required_fields());
    }

    #[test]
    fn draft_into_issue_fills_defaults() {
        let draft = IssueDraft {
            issue_title: Some("Title".to_string()),
            issue_text: Some("Text".to_string()),
            created_by: Some("Functional Test".to_string()),
            ..IssueDraft::default()
        };
        let issue = draft.into_issue("abc123".to_string(), fixed_time());

        assert_eq!(issue.id, "abc123");
        assert!(issue.open);
        assert_eq!(issue.assigned_to, "");
        assert_eq!(issue.status_text, "");
        assert_eq!(issue.created_on, issue.updated_on);
    }

    #[test]
    fn patch_submitted_id_treats_empty_as_missing() {
        let absent = IssuePatch::default();
        assert_eq!(absent.submitted_id(), None);

        let empty = IssuePatch {
            id: Some(String::new()),
            ..IssuePatch::default()
        };
        assert_eq!(empty.submitted_id(), None);

        let present = IssuePatch {
            id: Some("abc123".to_string()),
            ..IssuePatch::default()
        };
        assert_eq!(present.submitted_id(), Some("abc123"));
    }

    #[test]
    fn patch_update_field_presence_follows_truthiness() {
        assert!(!IssuePatch::default().has_update_fields());

        let empty_text = IssuePatch {
            issue_title: Some(String::new()),
            ..IssuePatch::default()
        };
        assert!(!empty_text.has_update_fields());

        let falsy_open = IssuePatch {
            open: json!(false),
            ..IssuePatch::default()
        };
        assert!(!falsy_open.has_update_fields());

        let truthy_open = IssuePatch {
            open: json!(true),
            ..IssuePatch::default()
        };
        assert!(truthy_open.has_update_fields());

        let text = IssuePatch {
            assigned_to: Some("Maya".to_string()),
            ..IssuePatch::default()
        };
        assert!(text.has_update_fields());
    }

    #[test]
    fn patch_deserializes_loose_payloads() {
        let patch: IssuePatch = serde_json::from_value(json!({
            "_id": "abc123",
            "issue_title": "New title",
            "open": "closing",
            "unrelated": 42,
        }))
        .expect("loose payload should deserialize");

        assert_eq!(patch.submitted_id(), Some("abc123"));
        assert_eq!(patch.issue_title.as_deref(), Some("New title"));
        assert!(patch.wants_close());
    }

    #[test]
    fn new_issue_id_is_32_hex_characters() {
        let id = new_issue_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_issue_id(), id);
    }
}
