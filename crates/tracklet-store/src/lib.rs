//! Storage backends for project documents.
//!
//! [`ProjectStore`] is the seam the issue service writes through. Its
//! primitives are shaped like a document-store client: targeted finds,
//! an explicit find-or-create, and array push/replace/pull writes that
//! report matched/modified counts.

use tracklet_core::{Issue, ProjectDocument};

pub mod file;
pub mod jsonl;
pub mod memory;

pub use file::JsonlProjectStore;
pub use jsonl::JsonlError;
pub use memory::MemoryProjectStore;

/// Counts reported by a write primitive, shaped like a document-store
/// client's update result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    pub matched: u64,
    pub modified: u64,
}

impl WriteOutcome {
    /// Nothing matched the write's target.
    pub const MISSED: WriteOutcome = WriteOutcome {
        matched: 0,
        modified: 0,
    };

    /// One target matched; `modified` says whether the write changed it.
    pub fn matched_one(modified: bool) -> WriteOutcome {
        WriteOutcome {
            matched: 1,
            modified: modified.into(),
        }
    }
}

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("collection lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("failed to acquire collection lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },
}

/// A persistence backend holding one document per project.
///
/// Project documents are created on demand and never deleted, so a
/// caller that has run [`ProjectStore::find_or_create_project`] may rely
/// on the document existing for later writes.
pub trait ProjectStore: Send + Sync {
    /// Fetch a project document by name.
    fn find_project(&self, name: &str) -> Result<Option<ProjectDocument>, StoreError>;

    /// Fetch a project document, creating an empty one if absent.
    fn find_or_create_project(&self, name: &str) -> Result<ProjectDocument, StoreError>;

    /// Append an issue to a project's sequence.
    ///
    /// Misses when the project document does not exist.
    fn push_issue(&self, project: &str, issue: &Issue) -> Result<WriteOutcome, StoreError>;

    /// Replace the stored issue whose `_id` matches `issue.id`, keeping
    /// its position in the sequence.
    ///
    /// Misses when the project or the issue does not exist. Reports
    /// `modified = 0` when the replacement equals the stored record.
    fn replace_issue(&self, project: &str, issue: &Issue) -> Result<WriteOutcome, StoreError>;

    /// Remove the issue with the given `_id` from a project's sequence.
    ///
    /// Matches when the project document exists, whether or not an issue
    /// was removed; `modified` reports the actual removal.
    fn pull_issue(&self, project: &str, id: &str) -> Result<WriteOutcome, StoreError>;
}
