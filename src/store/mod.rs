//! Store Module
//!
//! A single-file hierarchical bucket store.
//!
//! ## Responsibilities
//! - Open a store file, recovering its contents from the log
//! - Concurrent read transactions over immutable snapshots
//! - Serialized write transactions, logged before they become visible
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Reads** (`view`): clone the current root `Arc` under a brief read
//!   lock, then walk it with no lock held. Any number run in parallel, and
//!   they never observe a half-applied write.
//! - **Writes** (`update`/`batch`): serialized by `write_lock`. The
//!   transaction edits a private copy of the tree; on success the changes
//!   are appended to the log and the new root is swapped in. If the log
//!   write fails it is rolled back and the old root stays.
//! - **Across processes**: an advisory lock on the store file, exclusive for
//!   `ReadWrite` and shared for `ReadOnly`, held until the store is dropped.

mod bucket;
mod tx;

pub mod log;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::{Mutex, RwLock};

use crate::config::StoreConfig;
use crate::error::{MonkeyError, Result};
use self::log::{LogRecovery, LogWriter};

pub use bucket::{Bucket, BucketMut, Entries, Entry};
pub use self::log::create_store_file;
pub use tx::{ReadTx, WriteTx};

use bucket::Node;

/// How a store file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only; the file is never modified
    ReadOnly,

    /// Reads and writes; a damaged log tail is cut off on open
    ReadWrite,
}

/// An open store
#[derive(Debug)]
pub struct Store {
    path: PathBuf,

    mode: OpenMode,

    /// Current committed tree
    root: RwLock<Arc<Node>>,

    /// Log appender, absent for read-only stores
    log: Option<Mutex<LogWriter>>,

    /// Serializes write transactions
    write_lock: Mutex<()>,

    /// Handle carrying the file lock; released on drop
    _lock: File,
}

impl Store {
    /// Open a store with the default config
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::open_with(path, mode, StoreConfig::default())
    }

    /// Open a store
    ///
    /// On open:
    /// 1. Check the path is an existing regular file
    /// 2. Lock it (fails with `StoreLocked` if another handle conflicts)
    /// 3. Scan the log and replay every valid transaction
    /// 4. For read-write stores, position the log for appends
    pub fn open_with(path: impl AsRef<Path>, mode: OpenMode, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let metadata = fs::metadata(&path).map_err(|source| MonkeyError::StoreOpen {
            path: path.clone(),
            source,
        })?;
        if metadata.is_dir() {
            return Err(MonkeyError::StoreIsDirectory(path));
        }

        let lock = lock_file(&path, mode)?;

        let (entries, recovery) = LogRecovery::recover(&path)?;
        if recovery.was_truncated {
            tracing::warn!(
                "Store {} has a damaged tail: {} transactions recovered, {} corrupted, last_lsn={}",
                path.display(),
                recovery.entries_recovered,
                recovery.entries_corrupted,
                recovery.last_lsn
            );
        } else {
            tracing::debug!(
                "Opened {}: {} transactions, last_lsn={}",
                path.display(),
                recovery.entries_recovered,
                recovery.last_lsn
            );
        }

        let mut root = Node::default();
        for entry in &entries {
            for operation in &entry.operations {
                root.apply(operation)?;
            }
        }

        let log = match mode {
            OpenMode::ReadOnly => None,
            OpenMode::ReadWrite => Some(Mutex::new(LogWriter::open_after(
                &path,
                config.sync_strategy,
                &recovery,
            )?)),
        };

        Ok(Self {
            path,
            mode,
            root: RwLock::new(Arc::new(root)),
            log,
            write_lock: Mutex::new(()),
            _lock: lock,
        })
    }

    /// Run a read transaction
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTx) -> Result<T>,
    {
        let tx = ReadTx::new(Arc::clone(&self.root.read()));
        f(&tx)
    }

    /// Run a write transaction, fsyncing the log on commit.
    ///
    /// If `f` fails nothing is written and the store is unchanged.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx) -> Result<T>,
    {
        self.commit(f, true)
    }

    /// Run a write transaction whose fsync follows the sync strategy.
    ///
    /// Suited to many small sequential writes; anything left unsynced is
    /// synced by [`close`](Self::close) or on drop.
    pub fn batch<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTx) -> Result<T>,
    {
        self.commit(f, false)
    }

    fn commit<T, F>(&self, f: F, force_sync: bool) -> Result<T>
    where
        F: FnOnce(&mut WriteTx) -> Result<T>,
    {
        let log = self.log.as_ref().ok_or(MonkeyError::ReadOnly)?;
        let _write_guard = self.write_lock.lock();

        let snapshot = Arc::clone(&self.root.read());
        let mut tx = WriteTx::new(Node::clone(&snapshot));
        let value = f(&mut tx)?;

        let (root, ops) = tx.into_parts();
        if ops.is_empty() {
            return Ok(value);
        }

        {
            let mut log = log.lock();
            let written = log
                .append(ops)
                .and_then(|lsn| log.commit(force_sync).map(|()| lsn));
            match written {
                Ok(lsn) => tracing::trace!("Committed LSN {}", lsn),
                Err(e) => {
                    if let Err(reset) = log.rollback() {
                        tracing::warn!(
                            "Could not roll back failed write to {}: {}",
                            self.path.display(),
                            reset
                        );
                    }
                    return Err(e);
                }
            }
        }

        *self.root.write() = Arc::new(root);
        Ok(value)
    }

    /// Close the store, syncing anything pending
    pub fn close(self) -> Result<()> {
        if let Some(log) = &self.log {
            log.lock().sync()?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path the store was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode the store was opened in
    pub fn mode(&self) -> OpenMode {
        self.mode
    }
}

/// Take the advisory lock matching `mode` without waiting
fn lock_file(path: &Path, mode: OpenMode) -> Result<File> {
    let file = File::open(path).map_err(|source| MonkeyError::StoreOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let locked = match mode {
        OpenMode::ReadOnly => FileExt::try_lock_shared(&file),
        OpenMode::ReadWrite => FileExt::try_lock_exclusive(&file),
    };
    match locked {
        Ok(()) => Ok(file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(MonkeyError::StoreLocked(path.to_path_buf()))
        }
        Err(source) => Err(MonkeyError::StoreOpen {
            path: path.to_path_buf(),
            source,
        }),
    }
}
