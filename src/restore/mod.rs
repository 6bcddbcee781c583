//! Restore from backup sessions
//!
//! Restores are synchronous and entry-by-entry. A conflicting destination,
//! a corrupt payload, or a failed write fails that entry only; the result
//! says which entries failed and why.

mod engine;

pub use engine::{RestoreEngine, PRE_RESTORE_OPERATION};
