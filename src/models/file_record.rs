//! Scanned filesystem entries

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::safety::SafetyClassification;
use crate::error::{CleanerError, CleanerResult};

/// One scanned filesystem entry
///
/// Normally produced by the external scanner; `probe` builds one directly
/// from the filesystem when a caller only has a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
    pub last_modified: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub permissions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_classification: Option<SafetyClassification>,
}

impl FileRecord {
    /// Build a record from the filesystem
    pub fn probe(path: &Path) -> CleanerResult<Self> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| CleanerError::Io(format!("{}: {}", path.display(), e)))?;

        Ok(Self::from_metadata(path, &metadata))
    }

    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        let last_modified = to_utc(metadata.modified().ok());
        let last_accessed = metadata
            .accessed()
            .ok()
            .map(|t| to_utc(Some(t)))
            .unwrap_or(last_modified);

        Self {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
            last_modified,
            last_accessed,
            permissions: permission_string(metadata),
            safety_classification: None,
        }
    }

    pub fn with_classification(mut self, classification: SafetyClassification) -> Self {
        self.safety_classification = Some(classification);
        self
    }
}

fn to_utc(time: Option<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from).unwrap_or_else(Utc::now)
}

/// `rwxr-xr-x` style string on unix
#[cfg(unix)]
fn permission_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    let mut out = String::with_capacity(10);
    out.push(if metadata.is_dir() { 'd' } else { '-' });
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn permission_string(metadata: &Metadata) -> String {
    if metadata.permissions().readonly() {
        "readonly".to_string()
    } else {
        "readwrite".to_string()
    }
}
