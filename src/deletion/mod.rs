//! Validated, backed-up, cancellable deletion
//!
//! # Flow
//!
//! 1. `DeletionEngine::validate` probes and classifies each path and returns a
//!    `ValidationResult` confirmation document.
//! 2. `DeletionEngine::confirm` (or `start` for callers that skip the
//!    confirmation step) re-validates and launches a background worker.
//! 3. The worker backs each file up into a new session before deleting it,
//!    publishing progress that `DeletionEngine::progress` polls.
//!
//! Blocked paths (missing, protected, open elsewhere) are never deleted.
//! Risky paths and files whose backup failed are deleted only with force.

mod confirmation;
mod engine;
mod progress;
mod validation;

pub use confirmation::{message_for, title_for, ValidationResult};
pub use engine::{DeletionEngine, DeletionRequest};
pub use progress::{OperationHandle, OperationTracker};
pub use validation::{dedup, PathVerdict, ValidationReport, Validator, VerdictKind};
