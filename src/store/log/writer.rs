//! Log Writer
//!
//! Handles appending committed transactions to the store file.
//!
//! Records are appended, then committed. A commit flushes them to the file
//! (and fsyncs when due); anything appended but not committed can be rolled
//! back, leaving the file and the LSN sequence as they were after the last
//! commit.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::config::LogSyncStrategy;
use crate::error::{MonkeyError, Result};
use super::{create_store_file, write_file_header, LogEntry, LogRecovery, Operation, RecoveryResult};

/// Appends records to the store file
#[derive(Debug)]
pub struct LogWriter {
    writer: BufWriter<File>,

    /// LSN the next record will carry
    next_lsn: u64,

    sync_strategy: LogSyncStrategy,

    /// Committed records not yet fsynced
    unsynced: usize,

    /// File length covering every committed record
    committed_len: u64,

    /// LSN of the last committed record
    committed_lsn: u64,

    /// Records appended since the last commit, and their encoded size
    pending: usize,
    pending_len: u64,

    /// Set when a failed write could not be rolled back
    poisoned: bool,
}

impl LogWriter {
    /// Open or create a store file for appending
    pub fn open(path: &Path, sync_strategy: LogSyncStrategy) -> Result<Self> {
        if !path.exists() {
            create_store_file(path)?;
        }
        let recovery = LogRecovery::verify(path)?;
        Self::open_after(path, sync_strategy, &recovery)
    }

    /// Open for appending after a recovery scan of the same file.
    ///
    /// Stamps the header on an empty file and cuts off any tail the scan
    /// rejected.
    pub fn open_after(
        path: &Path,
        sync_strategy: LogSyncStrategy,
        recovery: &RecoveryResult,
    ) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        if file.metadata()?.len() == 0 {
            write_file_header(&mut file)?;
            file.sync_all()?;
        } else if recovery.was_truncated {
            tracing::warn!(
                "Discarding {} bytes of damaged log tail after LSN {}",
                file.metadata()?.len().saturating_sub(recovery.valid_len),
                recovery.last_lsn
            );
            file.set_len(recovery.valid_len)?;
            file.sync_all()?;
        }

        let committed_len = file.seek(SeekFrom::End(0))?;

        Ok(Self {
            writer: BufWriter::new(file),
            next_lsn: recovery.last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            committed_len,
            committed_lsn: recovery.last_lsn,
            pending: 0,
            pending_len: 0,
            poisoned: false,
        })
    }

    /// Append one transaction; returns its LSN.
    ///
    /// The record is buffered. Call [`commit`](Self::commit) to make it
    /// part of the log, or [`rollback`](Self::rollback) to drop it.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        self.check_usable()?;

        let lsn = self.next_lsn;
        let bytes = LogEntry::new(lsn, operations).serialize()?;
        self.writer.write_all(&bytes)?;
        self.next_lsn += 1;
        self.pending += 1;
        self.pending_len += bytes.len() as u64;
        Ok(lsn)
    }

    /// Flush appended records to the file, fsyncing if the strategy (or
    /// `force`) asks
    pub fn commit(&mut self, force: bool) -> Result<()> {
        self.check_usable()?;

        let unsynced = self.unsynced + self.pending;
        let due = match self.sync_strategy {
            LogSyncStrategy::EveryWrite => true,
            LogSyncStrategy::EveryNEntries { count } => unsynced >= count,
        };

        self.writer.flush()?;
        if force || due {
            self.writer.get_ref().sync_data()?;
            self.unsynced = 0;
        } else {
            self.unsynced = unsynced;
        }

        self.committed_len += self.pending_len;
        self.committed_lsn = self.next_lsn - 1;
        self.pending = 0;
        self.pending_len = 0;
        Ok(())
    }

    /// Drop everything appended since the last commit, including bytes a
    /// failed flush may have left in the file.
    ///
    /// If the file cannot be restored the writer refuses further work.
    pub fn rollback(&mut self) -> Result<()> {
        match self.reset_to_committed() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.poisoned = true;
                Err(e)
            }
        }
    }

    fn reset_to_committed(&mut self) -> Result<()> {
        let mut file = self.writer.get_ref().try_clone()?;
        file.set_len(self.committed_len)?;
        file.seek(SeekFrom::Start(self.committed_len))?;

        // Swap in a fresh buffer; the old one is taken apart unflushed
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        drop(stale.into_parts());

        tracing::debug!(
            "Rolled back {} uncommitted records after LSN {}",
            self.pending,
            self.committed_lsn
        );
        self.next_lsn = self.committed_lsn + 1;
        self.pending = 0;
        self.pending_len = 0;
        Ok(())
    }

    /// Commit anything appended and fsync
    pub fn sync(&mut self) -> Result<()> {
        self.commit(true)
    }

    fn check_usable(&self) -> Result<()> {
        if self.poisoned {
            Err(MonkeyError::LogPoisoned)
        } else {
            Ok(())
        }
    }

    /// Get the LSN the next record will carry
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Committed records not yet fsynced
    pub fn unsynced(&self) -> usize {
        self.unsynced
    }

    /// Records appended but not yet committed
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// File length covering every committed record
    pub fn committed_len(&self) -> u64 {
        self.committed_len
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if !self.poisoned && (self.unsynced > 0 || self.pending > 0) {
            if let Err(e) = self.sync() {
                tracing::warn!("Failed to sync store log on close: {}", e);
            }
        }
    }
}
