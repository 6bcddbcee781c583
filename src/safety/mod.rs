//! Safety classification of deletion candidates
//!
//! The deletion engine consumes classifiers through the `SafetyClassifier`
//! trait. `RuleClassifier` is the built-in implementation; callers with
//! their own rule engine plug it in through `CleanerApp::with_classifier`.

mod classifier;

pub use classifier::{ClassifierConfig, RuleClassifier, SafetyClassifier};
