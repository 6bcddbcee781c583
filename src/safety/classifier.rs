//! Rule-based safety classifier
//!
//! Scores a file starting from 50 and adjusts for age, size, location, and
//! permissions. Location rules pin the level outright: a system-critical
//! path is always Risky, a temp location is Safe unless already Risky, a
//! development cache is Caution unless already Risky. Otherwise the score
//! decides (>= 70 Safe, >= 40 Caution, else Risky).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FileRecord, SafetyClassification, SafetyLevel};

const BASE_CONFIDENCE: i32 = 50;
const SMALL_FILE_BYTES: u64 = 1024;
const MIB: f64 = 1024.0 * 1024.0;

/// Anything that can judge how risky deleting a file is
///
/// Implementations must be pure: the same record yields the same verdict.
pub trait SafetyClassifier: Send + Sync {
    fn classify(&self, file: &FileRecord) -> SafetyClassification;
}

/// Thresholds and path patterns for `RuleClassifier`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Files untouched for longer than this are considered stale
    pub safe_age_days: u32,
    /// Files modified more recently than this need a closer look
    pub caution_age_days: u32,
    pub large_file_bytes: u64,
    /// Substrings that mark a path as system-critical
    pub system_critical_paths: Vec<String>,
    pub temp_patterns: Vec<String>,
    pub dev_cache_patterns: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            safe_age_days: 30,
            caution_age_days: 7,
            large_file_bytes: 100 * 1024 * 1024,
            system_critical_paths: strings(&[
                "/System/",
                "/usr/",
                "/var/log/",
                "/Library/Logs/",
                "/Applications/",
                "/bin/",
                "/sbin/",
                "/system/library/",
                "/private/var/db/",
                "/private/var/run/",
            ]),
            temp_patterns: strings(&[
                "/tmp/",
                "/var/tmp/",
                "/Library/Caches/",
                "/private/var/folders/",
                "/.cache/",
                "temp",
                "tmp",
                "cache",
            ]),
            dev_cache_patterns: strings(&[
                "node_modules",
                ".git",
                "build/",
                "dist/",
                "target/",
                ".gradle",
                ".m2/",
            ]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Default classifier driven by `ClassifierConfig`
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    config: ClassifierConfig,
}

impl RuleClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Classify as of a fixed instant
    pub fn classify_at(&self, file: &FileRecord, now: DateTime<Utc>) -> SafetyClassification {
        let mut reasons = Vec::new();
        let mut confidence = BASE_CONFIDENCE;
        let mut pinned: Option<SafetyLevel> = None;

        let age_days = (now - file.last_modified).num_days().max(0);
        if age_days > i64::from(self.config.safe_age_days) {
            reasons.push(format!(
                "File is {} days old (safe threshold: {} days)",
                age_days, self.config.safe_age_days
            ));
            confidence += 20;
        } else if age_days < i64::from(self.config.caution_age_days) {
            reasons.push(format!(
                "File is recent ({} days old, caution threshold: {} days)",
                age_days, self.config.caution_age_days
            ));
            confidence -= 15;
        }

        if file.size > self.config.large_file_bytes {
            reasons.push(format!(
                "Large file size: {:.2} MB (threshold: {:.2} MB)",
                file.size as f64 / MIB,
                self.config.large_file_bytes as f64 / MIB
            ));
            confidence -= 10;
        } else if file.size < SMALL_FILE_BYTES {
            reasons.push("Very small file size, likely safe to delete".to_string());
            confidence += 5;
        }

        let path = normalize(&file.path.to_string_lossy());
        let name = file.name.to_lowercase();

        if matches_any(&path, &self.config.system_critical_paths) {
            reasons.push("Located in system-critical directory".to_string());
            confidence -= 30;
            pinned = Some(SafetyLevel::Risky);
        }

        if matches_any(&path, &self.config.temp_patterns) {
            reasons.push("Located in temporary directory".to_string());
            confidence += 25;
            if pinned != Some(SafetyLevel::Risky) {
                pinned = Some(SafetyLevel::Safe);
            }
        }

        if matches_any(&path, &self.config.dev_cache_patterns)
            || matches_any(&name, &self.config.dev_cache_patterns)
        {
            reasons.push("Development cache detected".to_string());
            confidence -= 5;
            if pinned != Some(SafetyLevel::Risky) {
                pinned = Some(SafetyLevel::Caution);
            }
        }

        if is_read_only(&file.permissions) {
            reasons.push("Read-only file, may be system-critical".to_string());
            confidence -= 5;
        }

        let level = pinned.unwrap_or(if confidence >= 70 {
            SafetyLevel::Safe
        } else if confidence >= 40 {
            SafetyLevel::Caution
        } else {
            SafetyLevel::Risky
        });

        let confidence = confidence.clamp(0, 100);
        let explanation = explain(level, confidence, &reasons);
        SafetyClassification::new(level, confidence, explanation, reasons)
    }
}

impl SafetyClassifier for RuleClassifier {
    fn classify(&self, file: &FileRecord) -> SafetyClassification {
        self.classify_at(file, Utc::now())
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

fn matches_any(haystack: &str, patterns: &[String]) -> bool {
    patterns
        .iter()
        .any(|p| !p.is_empty() && haystack.contains(&normalize(p)))
}

/// Owner can read but nobody can write
fn is_read_only(permissions: &str) -> bool {
    if permissions == "readonly" {
        return true;
    }
    permissions.contains("r--") && !permissions.contains('w')
}

fn explain(level: SafetyLevel, confidence: i32, reasons: &[String]) -> String {
    let (label, tail) = match level {
        SafetyLevel::Safe => (
            "classified as SAFE to delete",
            "It appears to be a temporary or cache file that can be safely removed without affecting system functionality.",
        ),
        SafetyLevel::Caution => (
            "classified as requiring CAUTION",
            "Review the file details before deletion as it may contain important data or be recently used.",
        ),
        SafetyLevel::Risky | SafetyLevel::Unknown => (
            "classified as RISKY to delete",
            "This file appears to be in a system-critical location or may contain important data. Deletion is not recommended.",
        ),
    };

    let mut out = format!("This file is {} with {}% confidence. ", label, confidence);
    if !reasons.is_empty() {
        let top: Vec<&str> = reasons.iter().take(3).map(String::as_str).collect();
        out.push_str("Key factors: ");
        out.push_str(&top.join("; "));
        out.push_str(". ");
    }
    out.push_str(tail);
    out
}
