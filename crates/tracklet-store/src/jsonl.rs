//! JSONL collection files: one project document per line.
//!
//! The portable on-disk format. Writes go through a temp file and an atomic
//! rename so readers only ever observe a complete collection.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracklet_core::ProjectDocument;

/// Read project documents from a JSONL reader.
///
/// Blank lines and `#` comment lines are skipped, so hand-edited fixture
/// files stay loadable.
pub fn read_documents(reader: impl BufRead) -> Result<Vec<ProjectDocument>, JsonlError> {
    let mut documents = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let document: ProjectDocument = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        documents.push(document);
    }
    Ok(documents)
}

/// Write project documents to a JSONL writer.
pub fn write_documents(
    writer: &mut impl Write,
    documents: &[ProjectDocument],
) -> Result<(), JsonlError> {
    for document in documents {
        let line =
            serde_json::to_string(document).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read project documents from a JSONL file path.
pub fn read_documents_from_path(
    path: impl AsRef<Path>,
) -> Result<Vec<ProjectDocument>, JsonlError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    validate_collection_bytes(path, &bytes)?;
    read_documents(BufReader::new(bytes.as_slice()))
}

/// Write project documents to a JSONL file path, atomically.
///
/// The collection lands in a unique sibling temp file first, synced to
/// disk, then renamed over the target; the parent directory is synced
/// last so the rename itself is durable.
pub fn write_documents_to_path(
    path: impl AsRef<Path>,
    documents: &[ProjectDocument],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let tmp_path = tmp_sibling_path(path);
    if let Err(error) = persist_synced(&tmp_path, documents) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(JsonlError::Io(
            0,
            format!("{} -> {}: {error}", tmp_path.display(), path.display()),
        ));
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|e| io_error(parent, e))?;
        dir.sync_all().map_err(|e| io_error(parent, e))?;
    }

    Ok(())
}

fn persist_synced(tmp_path: &Path, documents: &[ProjectDocument]) -> Result<(), JsonlError> {
    let file = File::create(tmp_path).map_err(|e| io_error(tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    write_documents(&mut writer, documents)?;
    writer.flush().map_err(|e| io_error(tmp_path, e))?;
    let file = writer.into_inner().map_err(|e| io_error(tmp_path, e))?;
    file.sync_all().map_err(|e| io_error(tmp_path, e))
}

fn io_error(at: &Path, err: impl std::fmt::Display) -> JsonlError {
    JsonlError::Io(0, format!("{}: {err}", at.display()))
}

fn tmp_sibling_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".{}.{unique}.tmp", std::process::id()));
    PathBuf::from(tmp)
}

fn validate_collection_bytes(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Errors from JSONL collection-file operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted collection file: {0}")]
    Corrupt(String),
}
