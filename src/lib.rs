//! Cache Cleaner - backup-first file deletion with verified restore
//!
//! This library provides the core of the cache cleaner: every file is copied
//! into a checksummed backup session before it is deleted, and any session
//! can be restored back to the original locations.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Sessions, entries, operations, classifications, restore results
//! - `storage`: Atomic JSON file helpers
//! - `backup`: Session store, checksums, retention
//! - `safety`: File safety classification
//! - `deletion`: Validation, confirmation, and the background deletion worker
//! - `restore`: Entry-by-entry restore with post-write verification
//! - `audit`: Deletion history log
//! - `api`: The JSON boundary (`CleanerApp`)
//! - `cli`, `display`, `logging`: The `cachecleaner` binary's plumbing
//!
//! # Example
//!
//! ```rust,ignore
//! use cache_cleaner::api::CleanerApp;
//! use cache_cleaner::config::{CleanerPaths, Settings};
//!
//! let paths = CleanerPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let app = CleanerApp::open(paths, settings)?;
//! ```

pub mod api;
pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod deletion;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod restore;
pub mod safety;
pub mod storage;

pub use error::{CleanerError, CleanerResult};
