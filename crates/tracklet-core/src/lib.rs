//! Core record model for the tracklet issue store.
//!
//! Everything here is pure data and decision logic: the stored [`Issue`]
//! shape, creation drafts and update patches with their loose presence
//! rules, exact-match filter criteria, and the canonical timestamp codec.
//! Storage lives in `tracklet-store`; the service and HTTP surface in
//! `tracklet-api`.

pub mod filter;
pub mod issue;
pub mod project;
pub mod timestamp;
pub mod truthy;

pub use filter::{FilterCriteria, FilterField};
pub use issue::{Issue, IssueDraft, IssuePatch, new_issue_id};
pub use project::ProjectDocument;
pub use truthy::json_truthy;
