//! Store Log Module
//!
//! The store file is an append-only log of committed write transactions.
//! Replaying it from the start rebuilds the bucket tree.
//!
//! ## Responsibilities
//! - Append one record per committed transaction
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Recovery: replay valid records, drop a torn or corrupt tail
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ File Header                             │
//! │ ┌──────────────┬──────────────┐         │
//! │ │ Magic "MNKY" │ Version (2)  │         │
//! │ └──────────────┴──────────────┘         │
//! ├─────────────────────────────────────────┤
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A zero-length file is an empty store with no header yet; the first
//! read-write open stamps the header.

mod entry;
mod writer;
mod reader;
mod recovery;

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{MonkeyError, Result};

pub use entry::{LogEntry, Operation, HEADER_SIZE, MAX_RECORD_SIZE};
pub use writer::LogWriter;
pub use reader::{Frame, LogReader};
pub use recovery::{LogRecovery, RecoveryResult};

/// Magic bytes identifying a monkey store file
pub const FILE_MAGIC: &[u8; 4] = b"MNKY";

/// Current store file format version
pub const FILE_VERSION: u16 = 1;

/// File header size: Magic (4) + Version (2)
pub const FILE_HEADER_SIZE: u64 = 6;

/// Validate the file header.
///
/// Returns `false` for a zero-length file (no header yet). Leaves the file
/// positioned just past the header.
pub(crate) fn read_file_header(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    if len < FILE_HEADER_SIZE {
        return Err(MonkeyError::StoreCorrupted(format!(
            "file is {} bytes, too short for a store header",
            len
        )));
    }

    let mut header = [0u8; FILE_HEADER_SIZE as usize];
    file.read_exact(&mut header)?;

    if &header[0..4] != FILE_MAGIC {
        return Err(MonkeyError::StoreCorrupted(format!(
            "not a monkey store (magic {:?})",
            &header[0..4]
        )));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != FILE_VERSION {
        return Err(MonkeyError::StoreCorrupted(format!(
            "unsupported store version: {}",
            version
        )));
    }

    Ok(true)
}

/// Write the file header at the current position
pub(crate) fn write_file_header<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(FILE_MAGIC)?;
    writer.write_all(&FILE_VERSION.to_le_bytes())?;
    Ok(())
}

/// Create an empty store file, owner read/write only
pub fn create_store_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    Ok(options.open(path)?)
}
