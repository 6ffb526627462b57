//! Project documents: one named record owning an ordered issue list.

use serde::{Deserialize, Serialize};

use crate::issue::Issue;

/// A persisted project: unique name plus its issues in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub name: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl ProjectDocument {
    /// Fresh document with no issues.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issues: Vec::new(),
        }
    }

    /// Position of the issue with the given id, if present.
    pub fn issue_position(&self, id: &str) -> Option<usize> {
        self.issues.iter().position(|issue| issue.id == id)
    }

    /// The issue with the given id, if present.
    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|issue| issue.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueDraft;
    use chrono::{TimeZone, Utc};

    fn issue_named(id: &str, title: &str) -> Issue {
        let now = Utc
            .with_ymd_and_hms(2017, 1, 8, 6, 35, 14)
            .single()
            .expect("fixed time");
        IssueDraft {
            issue_title: Some(title.to_string()),
            issue_text: Some("Text".to_string()),
            created_by: Some("Functional Test".to_string()),
            ..IssueDraft::default()
        }
        .into_issue(id.to_string(), now)
    }

    #[test]
    fn new_document_starts_empty() {
        let document = ProjectDocument::new("apitest");
        assert_eq!(document.name, "apitest");
        assert!(document.issues.is_empty());
    }

    #[test]
    fn issue_lookup_by_id() {
        let mut document = ProjectDocument::new("apitest");
        document.issues.push(issue_named("aa11", "First"));
        document.issues.push(issue_named("bb22", "Second"));

        assert_eq!(document.issue_position("bb22"), Some(1));
        assert_eq!(
            document.issue("aa11").map(|issue| issue.issue_title.as_str()),
            Some("First")
        );
        assert_eq!(document.issue_position("cc33"), None);
        assert!(document.issue("cc33").is_none());
    }

    #[test]
    fn document_tolerates_missing_issues_key() {
        let document: ProjectDocument =
            serde_json::from_str(r#"{"name":"apitest"}"#).expect("bare document should parse");
        assert!(document.issues.is_empty());
    }
}
