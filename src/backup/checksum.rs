//! SHA-256 content checksums for backup entries

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

const BUF_SIZE: usize = 64 * 1024;

/// Result of comparing a file against a recorded checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumCheck {
    Match,
    Mismatch { expected: String, actual: String },
}

impl ChecksumCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, ChecksumCheck::Match)
    }
}

/// Hex SHA-256 of a file's bytes, streamed
pub fn checksum_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUF_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

pub fn checksum_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Copy `src` to `dst`, hashing the bytes as they pass through
///
/// Returns `(bytes_copied, checksum_of_source)`. The destination is synced
/// before returning and carries the source's permissions.
pub fn copy_with_checksum(src: &Path, dst: &Path) -> io::Result<(u64, String)> {
    let mut input = File::open(src)?;
    let output = File::create(dst)?;
    let mut writer = BufWriter::new(output);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUF_SIZE];
    let mut copied = 0u64;

    loop {
        let n = input.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;

    if let Ok(metadata) = fs::metadata(src) {
        // Best effort; a read-only source still yields a usable payload
        let _ = fs::set_permissions(dst, metadata.permissions());
    }

    Ok((copied, hex::encode(hasher.finalize())))
}

/// Recompute a file's checksum and compare it with `expected`
pub fn verify_file(path: &Path, expected: &str) -> io::Result<ChecksumCheck> {
    let actual = checksum_file(path)?;
    let expected = expected.trim().to_lowercase();

    if actual == expected {
        Ok(ChecksumCheck::Match)
    } else {
        Ok(ChecksumCheck::Mismatch { expected, actual })
    }
}
