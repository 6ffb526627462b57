//! File-backed store: a JSONL collection file with lock-scoped writes.
//!
//! Reads go straight to the file; rename-atomic writes mean a reader sees
//! either the old or the new collection, never a torn one. Each write
//! primitive runs as one lock-scoped read-modify-write so concurrent
//! processes serialize on a `.lock` guard file next to the collection.
//! A writer polls a busy lock for a bounded window before reporting it.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracklet_core::{Issue, ProjectDocument};

use crate::jsonl::{read_documents_from_path, write_documents_to_path};
use crate::{ProjectStore, StoreError, WriteOutcome};

/// Lock-file path for a collection path: the same name plus `.lock`.
pub fn collection_lock_path(collection_path: &Path) -> PathBuf {
    let mut path: OsString = collection_path.as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Project documents stored in one JSONL collection file.
///
/// A missing file reads as an empty store; the first write creates it
/// (and its parent directory).
#[derive(Debug, Clone)]
pub struct JsonlProjectStore {
    path: PathBuf,
}

impl JsonlProjectStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<ProjectDocument>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(read_documents_from_path(&self.path)?)
    }

    /// Run one lock-scoped mutation of the collection.
    ///
    /// The mutator returns `(value, changed)`; `changed = true` persists
    /// the collection before the lock is released.
    fn mutate<T>(
        &self,
        mutator: impl FnOnce(&mut Vec<ProjectDocument>) -> (T, bool),
    ) -> Result<T, StoreError> {
        let _guard = CollectionLockGuard::acquire(&self.path)?;
        let mut documents = self.load()?;
        let (value, changed) = mutator(&mut documents);
        if changed {
            write_documents_to_path(&self.path, &documents)?;
        }
        Ok(value)
    }
}

impl ProjectStore for JsonlProjectStore {
    fn find_project(&self, name: &str) -> Result<Option<ProjectDocument>, StoreError> {
        Ok(self
            .load()?
            .into_iter()
            .find(|document| document.name == name))
    }

    fn find_or_create_project(&self, name: &str) -> Result<ProjectDocument, StoreError> {
        self.mutate(|documents| {
            if let Some(document) = documents.iter().find(|document| document.name == name) {
                (document.clone(), false)
            } else {
                let document = ProjectDocument::new(name);
                documents.push(document.clone());
                (document, true)
            }
        })
    }

    fn push_issue(&self, project: &str, issue: &Issue) -> Result<WriteOutcome, StoreError> {
        self.mutate(|documents| {
            match documents
                .iter_mut()
                .find(|document| document.name == project)
            {
                Some(document) => {
                    document.issues.push(issue.clone());
                    (WriteOutcome::matched_one(true), true)
                }
                None => (WriteOutcome::MISSED, false),
            }
        })
    }

    fn replace_issue(&self, project: &str, issue: &Issue) -> Result<WriteOutcome, StoreError> {
        self.mutate(|documents| {
            let Some(document) = documents
                .iter_mut()
                .find(|document| document.name == project)
            else {
                return (WriteOutcome::MISSED, false);
            };
            let Some(at) = document.issue_position(&issue.id) else {
                return (WriteOutcome::MISSED, false);
            };
            let modified = document.issues[at] != *issue;
            document.issues[at] = issue.clone();
            (WriteOutcome::matched_one(modified), modified)
        })
    }

    fn pull_issue(&self, project: &str, id: &str) -> Result<WriteOutcome, StoreError> {
        self.mutate(|documents| {
            let Some(document) = documents
                .iter_mut()
                .find(|document| document.name == project)
            else {
                return (WriteOutcome::MISSED, false);
            };
            match document.issue_position(id) {
                Some(at) => {
                    document.issues.remove(at);
                    (WriteOutcome::matched_one(true), true)
                }
                None => (WriteOutcome::matched_one(false), false),
            }
        })
    }
}

/// How long a writer polls a busy `.lock` before reporting it.
const LOCK_WAIT: Duration = Duration::from_millis(250);
const LOCK_POLL: Duration = Duration::from_millis(10);

struct CollectionLockGuard {
    lock_path: PathBuf,
    _file: File,
}

impl CollectionLockGuard {
    fn acquire(collection_path: &Path) -> Result<Self, StoreError> {
        let lock_path = collection_lock_path(collection_path);
        if let Some(parent) = lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::LockIo {
                lock_path: lock_path.display().to_string(),
                message: e.to_string(),
            })?;
        }

        let deadline = Instant::now() + LOCK_WAIT;
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    let _ = writeln!(
                        file,
                        "pid={}\nutc={}",
                        std::process::id(),
                        Utc::now().to_rfc3339()
                    );
                    return Ok(Self {
                        lock_path,
                        _file: file,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::LockBusy {
                            lock_path: lock_path.display().to_string(),
                        });
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(err) => {
                    return Err(StoreError::LockIo {
                        lock_path: lock_path.display().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

impl Drop for CollectionLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
