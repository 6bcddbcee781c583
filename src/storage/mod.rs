//! Storage layer for the cache cleaner
//!
//! JSON documents written atomically, plus the filesystem helpers the backup
//! store and deletion engine share.

pub mod file_io;

pub use file_io::{read_json_required, remove_path, write_json_atomic};
