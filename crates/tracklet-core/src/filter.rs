//! Exact-match filtering for issue listings.
//!
//! Filter keys come from an explicit allow-list of issue field names. Every
//! submitted key must match the issue's field after string coercion; a key
//! naming no known field matches nothing, which excludes every issue.

use crate::issue::Issue;
use crate::timestamp;

/// A filterable issue field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Id,
    IssueTitle,
    IssueText,
    CreatedBy,
    AssignedTo,
    StatusText,
    Open,
    CreatedOn,
    UpdatedOn,
}

impl FilterField {
    /// Parse a decoded query-parameter key into a known field.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "_id" => Some(Self::Id),
            "issue_title" => Some(Self::IssueTitle),
            "issue_text" => Some(Self::IssueText),
            "created_by" => Some(Self::CreatedBy),
            "assigned_to" => Some(Self::AssignedTo),
            "status_text" => Some(Self::StatusText),
            "open" => Some(Self::Open),
            "created_on" => Some(Self::CreatedOn),
            "updated_on" => Some(Self::UpdatedOn),
            _ => None,
        }
    }

    /// The field's value on a concrete issue, coerced to a string.
    ///
    /// Booleans render as `true`/`false` and timestamps in the canonical
    /// millisecond form, matching how the values appear on the wire.
    pub fn value_text(self, issue: &Issue) -> String {
        match self {
            Self::Id => issue.id.clone(),
            Self::IssueTitle => issue.issue_title.clone(),
            Self::IssueText => issue.issue_text.clone(),
            Self::CreatedBy => issue.created_by.clone(),
            Self::AssignedTo => issue.assigned_to.clone(),
            Self::StatusText => issue.status_text.clone(),
            Self::Open => issue.open.to_string(),
            Self::CreatedOn => timestamp::format_ms(&issue.created_on),
            Self::UpdatedOn => timestamp::format_ms(&issue.updated_on),
        }
    }
}

/// Conjunctive exact-match criteria built from decoded query parameters.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    entries: Vec<(String, String)>,
}

impl FilterCriteria {
    /// Criteria that match every issue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build criteria from decoded key/value pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an issue satisfies every criterion.
    pub fn matches(&self, issue: &Issue) -> bool {
        self.entries.iter().all(|(key, expected)| {
            FilterField::parse(key).is_some_and(|field| field.value_text(issue) == *expected)
        })
    }
}
