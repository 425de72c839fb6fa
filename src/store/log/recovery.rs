//! Log Recovery
//!
//! Rebuilds the committed history by scanning the log from the start.

use std::path::Path;

use crate::error::Result;
use super::{Frame, LogEntry, LogReader};

/// Handles log recovery on open
pub struct LogRecovery;

/// Result of a recovery scan
#[derive(Debug, Clone, Default)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (recovery stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether anything after the last valid record must be discarded
    pub was_truncated: bool,

    /// Byte offset where the valid part of the file ends
    pub valid_len: u64,
}

impl LogRecovery {
    /// Recover entries from a store file
    ///
    /// This will:
    /// 1. Read all valid entries in order
    /// 2. Stop at the first torn or corrupted record
    /// 3. Report where the valid prefix ends so a writer can truncate
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        Self::scan(path, true)
    }

    /// Verify integrity of a store file without keeping the entries
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Ok(Self::scan(path, false)?.1)
    }

    fn scan(path: &Path, keep: bool) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let mut reader = LogReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult {
            valid_len: reader.position(),
            ..RecoveryResult::default()
        };

        loop {
            match reader.read_frame()? {
                Frame::Entry(entry) => {
                    if entry.lsn <= result.last_lsn {
                        tracing::debug!(
                            "LSN {} does not follow {}, treating as corrupt",
                            entry.lsn,
                            result.last_lsn
                        );
                        result.entries_corrupted += 1;
                        result.was_truncated = true;
                        break;
                    }
                    result.last_lsn = entry.lsn;
                    result.entries_recovered += 1;
                    result.valid_len = reader.position();
                    if keep {
                        entries.push(entry);
                    }
                }
                Frame::End => break,
                Frame::Partial => {
                    result.was_truncated = true;
                    break;
                }
                Frame::Corrupt(reason) => {
                    tracing::debug!("Corrupt record after LSN {}: {}", result.last_lsn, reason);
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
            }
        }

        Ok((entries, result))
    }
}
