//! Issue service layer.
//!
//! This crate owns the operation contract: list, create, update, and delete
//! over a [`ProjectStore`] backend, each returning a domain outcome or a
//! typed refusal. The HTTP surface in [`http`] renders those outcomes in
//! the wire shapes existing clients depend on.

pub mod http;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracklet_core::{FilterCriteria, Issue, IssueDraft, IssuePatch, new_issue_id};
use tracklet_store::{ProjectStore, StoreError};

/// Refusals from issue operations.
///
/// Every variant but `Store` is a user-triggerable condition the wire layer
/// renders inside a 200 response.
#[derive(Debug, Error)]
pub enum IssueError {
    /// Creation payload lacks a required field.
    #[error("required field(s) missing")]
    RequiredFieldsMissing,

    /// Update or delete submitted without a usable `_id`.
    #[error("missing _id")]
    MissingId,

    /// Update submitted with an `_id` but nothing to change.
    #[error("no update field(s) sent for {id}")]
    NoUpdateFields { id: String },

    /// Update target absent: unknown project or unknown issue id.
    #[error("could not update {id}: no matching issue")]
    UpdateNotFound { id: String },

    /// Delete target absent: unknown project or unknown issue id.
    #[error("could not delete {id}: no matching issue")]
    DeleteNotFound { id: String },

    /// A write reported no modification, e.g. the issue vanished between
    /// lookup and write.
    #[error("write modified no stored record for {id}")]
    WriteMissed { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The four issue operations over a storage backend.
///
/// Mutating operations take the current time as an argument so stamping is
/// deterministic under test; callers pass [`tracklet_core::timestamp::now_ms`].
#[derive(Debug)]
pub struct IssueService<S: ProjectStore> {
    store: S,
}

impl<S: ProjectStore> IssueService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// List a project's issues in stored order, narrowed by criteria.
    ///
    /// A project with no document lists as empty; the document only
    /// materializes once an issue is created.
    pub fn list(
        &self,
        project: &str,
        criteria: &FilterCriteria,
    ) -> Result<Vec<Issue>, IssueError> {
        let Some(document) = self.store.find_project(project)? else {
            return Ok(Vec::new());
        };
        Ok(document
            .issues
            .into_iter()
            .filter(|issue| criteria.matches(issue))
            .collect())
    }

    /// Create an issue, materializing the project document if new.
    ///
    /// Returns the fully-populated record as stored.
    pub fn create(
        &self,
        project: &str,
        draft: IssueDraft,
        now: DateTime<Utc>,
    ) -> Result<Issue, IssueError> {
        if !draft.has_required_fields() {
            return Err(IssueError::RequiredFieldsMissing);
        }
        self.store.find_or_create_project(project)?;
        let issue = draft.into_issue(new_issue_id(), now);
        let outcome = self.store.push_issue(project, &issue)?;
        if outcome.matched != 1 {
            return Err(IssueError::WriteMissed { id: issue.id });
        }
        Ok(issue)
    }

    /// Merge a patch into one issue, stamping `updated_on`.
    ///
    /// Validation order is part of the contract: a missing `_id` wins over
    /// an empty patch, and both are checked before any store access.
    pub fn update(
        &self,
        project: &str,
        patch: &IssuePatch,
        now: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        let Some(id) = patch.submitted_id() else {
            return Err(IssueError::MissingId);
        };
        if !patch.has_update_fields() {
            return Err(IssueError::NoUpdateFields { id: id.to_string() });
        }

        let prior = self
            .store
            .find_project(project)?
            .and_then(|document| document.issue(id).cloned())
            .ok_or_else(|| IssueError::UpdateNotFound { id: id.to_string() })?;

        let merged = prior.apply_patch(patch, now);
        let outcome = self.store.replace_issue(project, &merged)?;
        if outcome.modified != 1 {
            return Err(IssueError::WriteMissed { id: id.to_string() });
        }
        Ok(id.to_string())
    }

    /// Remove one issue by the `_id` in the submitted payload.
    pub fn delete(&self, project: &str, payload: &IssuePatch) -> Result<String, IssueError> {
        let Some(id) = payload.submitted_id() else {
            return Err(IssueError::MissingId);
        };
        let outcome = self.store.pull_issue(project, id)?;
        if outcome.matched == 1 && outcome.modified == 1 {
            Ok(id.to_string())
        } else {
            Err(IssueError::DeleteNotFound { id: id.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;
    use tracklet_store::MemoryProjectStore;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 8, 6, 35, 14)
            .single()
            .expect("fixed time")
            + Duration::milliseconds(240)
    }

    fn later_time() -> DateTime<Utc> {
        fixed_time() + Duration::seconds(90)
    }

    fn service() -> IssueService<MemoryProjectStore> {
        IssueService::new(MemoryProjectStore::new())
    }

    fn complete_draft() -> IssueDraft {
        IssueDraft {
            issue_title: Some("Fix error".to_string()),
            issue_text: Some("Error posting data".to_string()),
            created_by: Some("Yogi Bear".to_string()),
            assigned_to: Some("Steve Smith".to_string()),
            status_text: Some("In progress".to_string()),
        }
    }

    #[test]
    fn list_unknown_project_returns_empty() {
        let issues = service()
            .list("nowhere", &FilterCriteria::new())
            .expect("list should succeed");
        assert!(issues.is_empty());
    }

    #[test]
    fn create_populates_every_field() {
        let service = service();
        let issue = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");

        assert_eq!(issue.issue_title, "Fix error");
        assert_eq!(issue.issue_text, "Error posting data");
        assert_eq!(issue.created_by, "Yogi Bear");
        assert_eq!(issue.assigned_to, "Steve Smith");
        assert_eq!(issue.status_text, "In progress");
        assert!(issue.open);
        assert_eq!(issue.created_on, fixed_time());
        assert_eq!(issue.updated_on, fixed_time());

        let listed = service
            .list("apitest", &FilterCriteria::new())
            .expect("list should succeed");
        assert_eq!(listed, vec![issue]);
    }

    #[test]
    fn create_defaults_optional_fields_to_empty() {
        let draft = IssueDraft {
            assigned_to: None,
            status_text: None,
            ..complete_draft()
        };
        let issue = service()
            .create("apitest", draft, fixed_time())
            .expect("create should succeed");
        assert_eq!(issue.assigned_to, "");
        assert_eq!(issue.status_text, "");
    }

    #[test]
    fn create_rejects_missing_required_fields() {
        let service = service();
        for broken in [
            IssueDraft {
                issue_title: None,
                ..complete_draft()
            },
            IssueDraft {
                issue_text: Some(String::new()),
                ..complete_draft()
            },
            IssueDraft {
                created_by: None,
                ..complete_draft()
            },
        ] {
            let err = service
                .create("apitest", broken, fixed_time())
                .expect_err("incomplete draft should be rejected");
            assert!(matches!(err, IssueError::RequiredFieldsMissing));
        }

        // Nothing persisted, not even the project document.
        let issues = service
            .list("apitest", &FilterCriteria::new())
            .expect("list should succeed");
        assert!(issues.is_empty());
    }

    #[test]
    fn create_assigns_distinct_ids() {
        let service = service();
        let first = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");
        let second = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn list_applies_filters_conjunctively() {
        let service = service();
        let by_george = IssueDraft {
            created_by: Some("Curious George".to_string()),
            ..complete_draft()
        };
        service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");
        let wanted = service
            .create("apitest", by_george, fixed_time())
            .expect("create should succeed");

        let criteria = FilterCriteria::from_pairs([
            ("created_by".to_string(), "Curious George".to_string()),
            ("open".to_string(), "true".to_string()),
        ]);
        let issues = service
            .list("apitest", &criteria)
            .expect("list should succeed");
        assert_eq!(issues, vec![wanted]);
    }

    #[test]
    fn update_requires_id_before_anything_else() {
        // Even a patch full of update fields is refused without an id.
        let patch = IssuePatch {
            issue_title: Some("New title".to_string()),
            open: json!(false),
            ..IssuePatch::default()
        };
        let err = service()
            .update("apitest", &patch, later_time())
            .expect_err("missing id should be refused");
        assert!(matches!(err, IssueError::MissingId));

        let blank_id = IssuePatch {
            id: Some(String::new()),
            issue_title: Some("New title".to_string()),
            ..IssuePatch::default()
        };
        let err = service()
            .update("apitest", &blank_id, later_time())
            .expect_err("blank id should be refused");
        assert!(matches!(err, IssueError::MissingId));
    }

    #[test]
    fn update_refuses_empty_patches() {
        let patch = IssuePatch {
            id: Some("5871dda29faedc3491ff93ee".to_string()),
            issue_title: Some(String::new()),
            status_text: Some(String::new()),
            open: json!(false),
            ..IssuePatch::default()
        };
        let err = service()
            .update("functionaltests", &patch, later_time())
            .expect_err("empty patch should be refused");
        match err {
            IssueError::NoUpdateFields { id } => assert_eq!(id, "5871dda29faedc3491ff93ee"),
            other => panic!("expected no-update-fields refusal, got {other:?}"),
        }
    }

    #[test]
    fn update_reports_unknown_targets() {
        let service = service();
        service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");

        let patch = IssuePatch {
            id: Some("blahblahblahinvalid_id".to_string()),
            issue_title: Some("New title".to_string()),
            ..IssuePatch::default()
        };
        let err = service
            .update("apitest", &patch, later_time())
            .expect_err("unknown id should be refused");
        assert!(matches!(err, IssueError::UpdateNotFound { .. }));

        // Unknown project reports the same way.
        let err = service
            .update("nowhere", &patch, later_time())
            .expect_err("unknown project should be refused");
        assert!(matches!(err, IssueError::UpdateNotFound { .. }));
    }

    #[test]
    fn update_merges_and_restamps() {
        let service = service();
        let created = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");

        let patch = IssuePatch {
            id: Some(created.id.clone()),
            created_by: Some("Lazlo".to_string()),
            issue_title: Some(String::new()),
            ..IssuePatch::default()
        };
        let id = service
            .update("apitest", &patch, later_time())
            .expect("update should succeed");
        assert_eq!(id, created.id);

        let listed = service
            .list("apitest", &FilterCriteria::new())
            .expect("list should succeed");
        assert_eq!(listed[0].created_by, "Lazlo");
        assert_eq!(listed[0].issue_title, "Fix error");
        assert_eq!(listed[0].created_on, fixed_time());
        assert_eq!(listed[0].updated_on, later_time());
    }

    #[test]
    fn update_with_truthy_open_closes_the_issue() {
        let service = service();
        let created = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");

        let patch = IssuePatch {
            id: Some(created.id.clone()),
            open: json!(true),
            ..IssuePatch::default()
        };
        service
            .update("apitest", &patch, later_time())
            .expect("close should succeed");

        let listed = service
            .list("apitest", &FilterCriteria::new())
            .expect("list should succeed");
        assert!(!listed[0].open);

        // Closing again still reports success and stays closed.
        service
            .update("apitest", &patch, later_time() + Duration::seconds(5))
            .expect("second close should succeed");
        let listed = service
            .list("apitest", &FilterCriteria::new())
            .expect("list should succeed");
        assert!(!listed[0].open);
    }

    #[test]
    fn delete_removes_exactly_one_issue() {
        let service = service();
        let doomed = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");
        let kept = service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");

        let payload = IssuePatch {
            id: Some(doomed.id.clone()),
            ..IssuePatch::default()
        };
        let id = service
            .delete("apitest", &payload)
            .expect("delete should succeed");
        assert_eq!(id, doomed.id);

        let listed = service
            .list("apitest", &FilterCriteria::new())
            .expect("list should succeed");
        assert_eq!(listed, vec![kept]);

        // Gone is gone.
        let err = service
            .delete("apitest", &payload)
            .expect_err("second delete should be refused");
        assert!(matches!(err, IssueError::DeleteNotFound { .. }));
    }

    #[test]
    fn delete_requires_an_id() {
        let err = service()
            .delete("apitest", &IssuePatch::default())
            .expect_err("missing id should be refused");
        assert!(matches!(err, IssueError::MissingId));
    }

    #[test]
    fn delete_reports_unknown_targets() {
        let service = service();
        service
            .create("apitest", complete_draft(), fixed_time())
            .expect("create should succeed");

        let payload = IssuePatch {
            id: Some("blahblahblahinvalid_id".to_string()),
            ..IssuePatch::default()
        };
        let err = service
            .delete("apitest", &payload)
            .expect_err("unknown id should be refused");
        assert!(matches!(err, IssueError::DeleteNotFound { .. }));

        let err = service
            .delete("nowhere", &payload)
            .expect_err("unknown project should be refused");
        assert!(matches!(err, IssueError::DeleteNotFound { .. }));
    }
}
