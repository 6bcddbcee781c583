//! Append-only deletion history
//!
//! Each entry is written as a single JSON line and flushed immediately.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use crate::error::{CleanerError, CleanerResult};

use super::entry::DeletionLogEntry;

/// Writes deletion history entries to a JSONL file
///
/// Appends from concurrent operations are serialized so lines never
/// interleave.
pub struct DeletionLog {
    log_path: PathBuf,
    write_lock: Mutex<()>,
}

impl DeletionLog {
    pub fn new(log_path: PathBuf) -> Self {
        Self {
            log_path,
            write_lock: Mutex::new(()),
        }
    }

    /// Append one entry
    pub fn log(&self, entry: &DeletionLogEntry) -> CleanerResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| CleanerError::Json(format!("Failed to serialize history entry: {}", e)))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| CleanerError::Io(format!("Failed to acquire history lock: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| CleanerError::Io(format!("Failed to open deletion history: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| CleanerError::Io(format!("Failed to write history entry: {}", e)))?;

        file.flush()
            .map_err(|e| CleanerError::Io(format!("Failed to flush deletion history: {}", e)))?;

        Ok(())
    }

    /// Append, reporting failures to the tracing log instead of the caller
    ///
    /// History is secondary to the deletion itself; a full disk here must not
    /// fail an operation that already backed up and deleted files.
    pub fn record(&self, entry: DeletionLogEntry) {
        if let Err(e) = self.log(&entry) {
            warn!(error = %e, message = %entry.message, "Failed to write deletion history");
        }
    }

    /// Read all entries, oldest first
    ///
    /// Lines that fail to parse (e.g. a write cut short by a crash) are skipped.
    pub fn read_all(&self) -> CleanerResult<Vec<DeletionLogEntry>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| CleanerError::Io(format!("Failed to open deletion history: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                CleanerError::Io(format!(
                    "Failed to read history line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<DeletionLogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = line_num + 1, error = %e, "Skipping unparseable history line"),
            }
        }

        Ok(entries)
    }

    /// The most recent `count` entries, oldest first
    pub fn read_recent(&self, count: usize) -> CleanerResult<Vec<DeletionLogEntry>> {
        let all_entries = self.read_all()?;
        let start = all_entries.len().saturating_sub(count);
        Ok(all_entries[start..].to_vec())
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::entry::LogLevel;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_test_log() -> (DeletionLog, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let log = DeletionLog::new(temp_dir.path().join("deletion_history.jsonl"));
        (log, temp_dir)
    }

    #[test]
    fn test_log_and_read() {
        let (log, _temp) = create_test_log();
        log.log(&DeletionLogEntry::info("Deletion started").with_operation("manual_deletion"))
            .unwrap();

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[0].operation.as_deref(), Some("manual_deletion"));
    }

    #[test]
    fn test_read_recent() {
        let (log, _temp) = create_test_log();
        for i in 0..10 {
            log.log(&DeletionLogEntry::info(format!("entry {}", i))).unwrap();
        }

        let recent = log.read_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].message, "entry 7");
        assert_eq!(recent[2].message, "entry 9");
    }

    #[test]
    fn test_empty_log() {
        let (log, _temp) = create_test_log();
        assert!(log.read_all().unwrap().is_empty());
        assert!(log.read_recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_line_is_skipped() {
        let (log, _temp) = create_test_log();
        log.log(&DeletionLogEntry::info("ok")).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
            write!(file, "{{\"timestamp\":\"2024-").unwrap();
        }

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let (log, _temp) = create_test_log();
        let log = Arc::new(log);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.record(DeletionLogEntry::warning(format!("t{} e{}", t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.read_all().unwrap().len(), 100);
    }
}
