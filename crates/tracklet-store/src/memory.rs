//! In-memory backend: a mutex-guarded map of project documents.
//!
//! The embedded backend for tests and ephemeral runs. Semantics mirror the
//! file-backed store exactly, minus durability.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracklet_core::{Issue, ProjectDocument};

use crate::{ProjectStore, StoreError, WriteOutcome};

/// Project documents held in process memory, keyed by project name.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: Mutex<BTreeMap<String, ProjectDocument>>,
}

impl MemoryProjectStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, for seeding fixtures.
    pub fn from_documents(documents: Vec<ProjectDocument>) -> Self {
        let projects = documents
            .into_iter()
            .map(|document| (document.name.clone(), document))
            .collect();
        Self {
            projects: Mutex::new(projects),
        }
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, ProjectDocument>> {
        // A poisoned map is still structurally sound; recover it.
        self.projects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProjectStore for MemoryProjectStore {
    fn find_project(&self, name: &str) -> Result<Option<ProjectDocument>, StoreError> {
        Ok(self.guard().get(name).cloned())
    }

    fn find_or_create_project(&self, name: &str) -> Result<ProjectDocument, StoreError> {
        let mut projects = self.guard();
        let document = projects
            .entry(name.to_string())
            .or_insert_with(|| ProjectDocument::new(name));
        Ok(document.clone())
    }

    fn push_issue(&self, project: &str, issue: &Issue) -> Result<WriteOutcome, StoreError> {
        let mut projects = self.guard();
        match projects.get_mut(project) {
            Some(document) => {
                document.issues.push(issue.clone());
                Ok(WriteOutcome::matched_one(true))
            }
            None => Ok(WriteOutcome::MISSED),
        }
    }

    fn replace_issue(&self, project: &str, issue: &Issue) -> Result<WriteOutcome, StoreError> {
        let mut projects = self.guard();
        let Some(document) = projects.get_mut(project) else {
            return Ok(WriteOutcome::MISSED);
        };
        let Some(at) = document.issue_position(&issue.id) else {
            return Ok(WriteOutcome::MISSED);
        };
        let modified = document.issues[at] != *issue;
        document.issues[at] = issue.clone();
        Ok(WriteOutcome::matched_one(modified))
    }

    fn pull_issue(&self, project: &str, id: &str) -> Result<WriteOutcome, StoreError> {
        let mut projects = self.guard();
        let Some(document) = projects.get_mut(project) else {
            return Ok(WriteOutcome::MISSED);
        };
        match document.issue_position(id) {
            Some(at) => {
                document.issues.remove(at);
                Ok(WriteOutcome::matched_one(true))
            }
            None => Ok(WriteOutcome::matched_one(false)),
        }
    }
}
