//! Safety classification attached to scanned files

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Risk verdict for deleting a file
///
/// Only `Safe`, `Caution`, and `Risky` are ever produced by a classifier.
/// `Unknown` is what an unrecognized level string degrades to when read from
/// outside; it is displayed as such and never treated as safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    Safe,
    Caution,
    Risky,
    Unknown,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "Safe",
            SafetyLevel::Caution => "Caution",
            SafetyLevel::Risky => "Risky",
            SafetyLevel::Unknown => "Unknown",
        }
    }

    /// Case-insensitive parse; anything unrecognized becomes `Unknown`
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => SafetyLevel::Safe,
            "caution" => SafetyLevel::Caution,
            "risky" => SafetyLevel::Risky,
            _ => SafetyLevel::Unknown,
        }
    }

    /// Whether deleting requires the caller to force past the classification
    ///
    /// An unrecognized level is gated like a risky one.
    pub fn requires_force(&self) -> bool {
        matches!(self, SafetyLevel::Risky | SafetyLevel::Unknown)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SafetyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SafetyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SafetyLevel::parse_lenient(&raw))
    }
}

/// A classifier's verdict for one file; immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyClassification {
    pub level: SafetyLevel,
    /// 0-100
    pub confidence: u8,
    pub explanation: String,
    /// Ordered, most significant first
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl SafetyClassification {
    pub fn new(
        level: SafetyLevel,
        confidence: i32,
        explanation: impl Into<String>,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            level,
            confidence: confidence.clamp(0, 100) as u8,
            explanation: explanation.into(),
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_parse() {
        assert_eq!(SafetyLevel::parse_lenient("Safe"), SafetyLevel::Safe);
        assert_eq!(SafetyLevel::parse_lenient("RISKY"), SafetyLevel::Risky);
        assert_eq!(SafetyLevel::parse_lenient(" caution "), SafetyLevel::Caution);
        assert_eq!(SafetyLevel::parse_lenient("dangerous"), SafetyLevel::Unknown);
    }

    #[test]
    fn test_unknown_level_does_not_fail_deserialization() {
        let json = r#"{"level":"Catastrophic","confidence":40,"explanation":"?","reasons":[]}"#;
        let classification: SafetyClassification = serde_json::from_str(json).unwrap();
        assert_eq!(classification.level, SafetyLevel::Unknown);
        assert!(classification.level.requires_force());
    }

    #[test]
    fn test_level_serializes_capitalized() {
        let json = serde_json::to_string(&SafetyLevel::Caution).unwrap();
        assert_eq!(json, "\"Caution\"");
    }

    #[test]
    fn test_confidence_is_clamped() {
        let high = SafetyClassification::new(SafetyLevel::Safe, 140, "", vec![]);
        let low = SafetyClassification::new(SafetyLevel::Risky, -5, "", vec![]);
        assert_eq!(high.confidence, 100);
        assert_eq!(low.confidence, 0);
    }
}
