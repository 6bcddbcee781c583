//! Pre-deletion safety validation
//!
//! Every requested path gets exactly one verdict. A blocked path is never
//! deleted, not even with force. A risky path is deleted only with force.
//! Validation never mutates anything and never fails as a whole because of
//! one bad path.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::models::{FileRecord, SafetyClassification, SafetyLevel};
use crate::safety::SafetyClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Deletable,
    Risky,
    Blocked,
}

#[derive(Debug, Clone, Serialize)]
pub struct PathVerdict {
    pub path: PathBuf,
    pub kind: VerdictKind,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<SafetyClassification>,
    /// Why the path was blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub verdicts: Vec<PathVerdict>,
    pub warnings: Vec<String>,
    pub details: Vec<String>,
}

impl ValidationReport {
    fn paths_of(&self, kind: VerdictKind) -> Vec<PathBuf> {
        self.verdicts
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| v.path.clone())
            .collect()
    }

    pub fn deletable(&self) -> Vec<PathBuf> {
        self.paths_of(VerdictKind::Deletable)
    }

    pub fn risky(&self) -> Vec<PathBuf> {
        self.paths_of(VerdictKind::Risky)
    }

    pub fn blocked(&self) -> Vec<PathBuf> {
        self.paths_of(VerdictKind::Blocked)
    }

    /// Paths a deletion will actually act on
    pub fn targets(&self, force: bool) -> Vec<PathBuf> {
        self.verdicts
            .iter()
            .filter(|v| match v.kind {
                VerdictKind::Deletable => true,
                VerdictKind::Risky => force,
                VerdictKind::Blocked => false,
            })
            .map(|v| v.path.clone())
            .collect()
    }

    /// Bytes across the deletable paths
    pub fn deletable_size(&self) -> u64 {
        self.verdicts
            .iter()
            .filter(|v| v.kind == VerdictKind::Deletable)
            .map(|v| v.size)
            .sum()
    }
}

pub struct Validator {
    settings: Arc<Settings>,
    classifier: Arc<dyn SafetyClassifier>,
}

impl Validator {
    pub fn new(settings: Arc<Settings>, classifier: Arc<dyn SafetyClassifier>) -> Self {
        Self {
            settings,
            classifier,
        }
    }

    /// Validate paths by probing the filesystem
    pub fn validate(&self, paths: &[PathBuf]) -> ValidationReport {
        let records = dedup(paths)
            .into_iter()
            .map(|path| match FileRecord::probe(&path) {
                Ok(record) => Ok(record),
                Err(e) => Err((path, e.to_string())),
            })
            .collect::<Vec<_>>();
        self.evaluate(records)
    }

    /// Validate records already produced by a scanner
    ///
    /// A record's existing classification is used as-is.
    pub fn validate_records(&self, records: Vec<FileRecord>) -> ValidationReport {
        self.evaluate(records.into_iter().map(Ok).collect())
    }

    fn evaluate(&self, candidates: Vec<Result<FileRecord, (PathBuf, String)>>) -> ValidationReport {
        let open_files = if self.settings.detect_open_files {
            open_file_set()
        } else {
            HashSet::new()
        };

        let mut report = ValidationReport::default();
        for candidate in candidates {
            let verdict = match candidate {
                Ok(record) => self.judge(record, &open_files),
                Err((path, error)) => blocked(path, 0, format!("File not found or unreadable: {}", error)),
            };
            self.describe(&verdict, &mut report);
            report.verdicts.push(verdict);
        }

        let blocked_count = report.verdicts.iter().filter(|v| v.kind == VerdictKind::Blocked).count();
        if blocked_count > 0 {
            report
                .warnings
                .push(format!("{} files blocked due to safety concerns", blocked_count));
        }

        report
    }

    fn judge(&self, record: FileRecord, open_files: &HashSet<PathBuf>) -> PathVerdict {
        let path = record.path.clone();
        let size = record.size;

        if !path.is_absolute() {
            return blocked(path, size, "Path must be absolute".to_string());
        }

        let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());

        if let Some(prefix) = self
            .settings
            .protected_paths
            .iter()
            .find(|p| path.starts_with(p) || resolved.starts_with(p))
        {
            return blocked(
                path,
                size,
                format!("System critical location ({})", prefix.display()),
            );
        }

        if !self.settings.allowed_roots.is_empty()
            && !self
                .settings
                .allowed_roots
                .iter()
                .any(|root| path.starts_with(root) || resolved.starts_with(root))
        {
            return blocked(path, size, "Outside allowed roots".to_string());
        }

        if parent_is_read_only(&path) {
            return blocked(
                path,
                size,
                "Insufficient permissions: parent directory is read-only".to_string(),
            );
        }

        if open_files.contains(&resolved) {
            return blocked(path, size, "File is open in another process".to_string());
        }

        let classification = match record.safety_classification.clone() {
            Some(existing) => existing,
            None => self.classifier.classify(&record),
        };

        let kind = if classification.level.requires_force() {
            VerdictKind::Risky
        } else {
            VerdictKind::Deletable
        };

        PathVerdict {
            path,
            kind,
            size,
            classification: Some(classification),
            reason: None,
        }
    }

    fn describe(&self, verdict: &PathVerdict, report: &mut ValidationReport) {
        let display = verdict.path.display();

        if verdict.kind == VerdictKind::Blocked {
            let reason = verdict.reason.as_deref().unwrap_or("blocked");
            report.details.push(format!("{}: {}", display, reason));
            return;
        }

        let Some(classification) = &verdict.classification else {
            return;
        };

        match classification.level {
            SafetyLevel::Risky => {
                report.warnings.push(format!("Risky file detected: {}", display));
                report.details.push(format!(
                    "{}: Risky (confidence {}%): {}",
                    display, classification.confidence, classification.explanation
                ));
            }
            SafetyLevel::Caution => {
                report.warnings.push(format!("Caution file detected: {}", display));
            }
            SafetyLevel::Unknown => {
                report
                    .warnings
                    .push(format!("Unrecognized safety level for: {}", display));
            }
            SafetyLevel::Safe => {}
        }
    }
}

fn blocked(path: PathBuf, size: u64, reason: String) -> PathVerdict {
    PathVerdict {
        path,
        kind: VerdictKind::Blocked,
        size,
        classification: None,
        reason: Some(reason),
    }
}

/// Drop repeated paths, keeping first occurrence order
pub fn dedup(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    paths
        .iter()
        .filter(|p| seen.insert((*p).clone()))
        .cloned()
        .collect()
}

fn parent_is_read_only(path: &Path) -> bool {
    path.parent()
        .and_then(|parent| std::fs::metadata(parent).ok())
        .map(|m| m.permissions().readonly())
        .unwrap_or(false)
}

/// Paths currently held open by any process we can inspect
#[cfg(target_os = "linux")]
fn open_file_set() -> HashSet<PathBuf> {
    let mut open = HashSet::new();
    let Ok(procs) = std::fs::read_dir("/proc") else {
        return open;
    };

    let me = std::process::id().to_string();
    for proc_entry in procs.flatten() {
        let name = proc_entry.file_name();
        let name = name.to_string_lossy();
        if !name.chars().all(|c| c.is_ascii_digit()) || name == me {
            continue;
        }

        // Other users' processes are unreadable without privileges; skip them
        let Ok(fds) = std::fs::read_dir(proc_entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(target) = std::fs::read_link(fd.path()) {
                if target.is_absolute() {
                    open.insert(target);
                }
            }
        }
    }

    open
}

#[cfg(not(target_os = "linux"))]
fn open_file_set() -> HashSet<PathBuf> {
    HashSet::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::RuleClassifier;
    use std::fs;
    use tempfile::TempDir;

    /// Marks anything whose name contains "risky" as Risky, everything else Safe
    struct NameClassifier;

    impl SafetyClassifier for NameClassifier {
        fn classify(&self, file: &FileRecord) -> SafetyClassification {
            if file.name.contains("risky") {
                SafetyClassification::new(SafetyLevel::Risky, 80, "looks important", vec![])
            } else {
                SafetyClassification::new(SafetyLevel::Safe, 90, "cache", vec![])
            }
        }
    }

    fn validator(settings: Settings) -> Validator {
        Validator::new(Arc::new(settings), Arc::new(NameClassifier))
    }

    fn open_settings() -> Settings {
        Settings {
            protected_paths: Vec::new(),
            detect_open_files: false,
            ..Settings::default()
        }
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_risky_file_warns_and_is_detailed() {
        let temp = TempDir::new().unwrap();
        let paths = vec![touch(&temp, "a.cache"), touch(&temp, "b.cache"), touch(&temp, "risky.db")];

        let report = validator(open_settings()).validate(&paths);

        assert!(!report.warnings.is_empty());
        assert!(report.details.iter().any(|d| d.contains("risky.db")));
        assert_eq!(report.deletable().len(), 2);
        assert_eq!(report.risky(), vec![paths[2].clone()]);
        assert_eq!(report.targets(false).len(), 2);
        assert_eq!(report.targets(true).len(), 3);
    }

    #[test]
    fn test_missing_path_is_blocked_not_fatal() {
        let temp = TempDir::new().unwrap();
        let good = touch(&temp, "ok");
        let missing = temp.path().join("missing");

        let report = validator(open_settings()).validate(&[good.clone(), missing.clone()]);

        assert_eq!(report.deletable(), vec![good]);
        assert_eq!(report.blocked(), vec![missing.clone()]);
        assert!(report.details.iter().any(|d| d.contains("missing")));
        // Blocked paths stay blocked under force
        assert!(!report.targets(true).contains(&missing));
    }

    #[test]
    fn test_protected_prefix_blocks() {
        let temp = TempDir::new().unwrap();
        let file = touch(&temp, "x");
        let settings = Settings {
            protected_paths: vec![temp.path().to_path_buf()],
            detect_open_files: false,
            ..Settings::default()
        };

        let report = validator(settings).validate(&[file.clone()]);
        assert_eq!(report.blocked(), vec![file]);
        assert!(report.details[0].contains("System critical"));
    }

    #[test]
    fn test_protected_prefix_is_component_wise() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("usrdata")).unwrap();
        let file = temp.path().join("usrdata").join("f");
        fs::write(&file, "x").unwrap();
        let settings = Settings {
            protected_paths: vec![temp.path().join("usr")],
            detect_open_files: false,
            ..Settings::default()
        };

        let report = validator(settings).validate(&[file.clone()]);
        assert_eq!(report.deletable(), vec![file]);
    }

    #[test]
    fn test_outside_allowed_roots_blocks() {
        let inside = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let a = touch(&inside, "a");
        let b = touch(&outside, "b");
        let settings = Settings {
            allowed_roots: vec![inside.path().to_path_buf()],
            ..open_settings()
        };

        let report = validator(settings).validate(&[a.clone(), b.clone()]);
        assert_eq!(report.deletable(), vec![a]);
        assert_eq!(report.blocked(), vec![b]);
    }

    #[test]
    fn test_relative_path_blocked() {
        let report = validator(open_settings()).validate(&[PathBuf::from("Cargo.toml")]);
        assert_eq!(report.blocked().len(), 1);
    }

    #[test]
    fn test_duplicates_collapse() {
        let temp = TempDir::new().unwrap();
        let a = touch(&temp, "a");
        let report = validator(open_settings()).validate(&[a.clone(), a.clone()]);
        assert_eq!(report.verdicts.len(), 1);
    }

    #[test]
    fn test_precomputed_classification_is_respected() {
        let temp = TempDir::new().unwrap();
        let path = touch(&temp, "plain");
        let record = FileRecord::probe(&path).unwrap().with_classification(
            SafetyClassification::new(SafetyLevel::Risky, 70, "scanner says so", vec![]),
        );

        let report = validator(open_settings()).validate_records(vec![record]);
        assert_eq!(report.risky(), vec![path]);
    }

    #[test]
    fn test_unknown_level_needs_force() {
        let temp = TempDir::new().unwrap();
        let path = touch(&temp, "odd");
        let record = FileRecord::probe(&path).unwrap().with_classification(
            SafetyClassification::new(SafetyLevel::Unknown, 0, "?", vec![]),
        );

        let report = validator(open_settings()).validate_records(vec![record]);
        assert_eq!(report.risky(), vec![path]);
        assert!(report.warnings.iter().any(|w| w.contains("Unrecognized")));
    }

    #[test]
    fn test_rule_classifier_plugs_in() {
        let temp = TempDir::new().unwrap();
        let path = touch(&temp, "blob");
        let v = Validator::new(Arc::new(open_settings()), Arc::new(RuleClassifier::default()));

        let report = v.validate(&[path]);
        assert_eq!(report.verdicts.len(), 1);
        assert!(report.verdicts[0].classification.is_some());
    }
}
