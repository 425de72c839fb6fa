//! Mutation Operations
//!
//! Point writes, reads and deletes against the single flat bucket the
//! key@value subcommands use. All three run sequentially on the calling
//! thread.

use crate::args::KeyValues;
use crate::config::FLAT_BUCKET;
use crate::error::{MonkeyError, Result};
use crate::store::Store;

/// Outcome of a grasp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraspReport {
    /// Pairs written
    pub stored: usize,

    /// Pairs that failed and were skipped
    pub failed: usize,
}

/// Store every pair, one batched write transaction per pair.
///
/// A failing pair is logged and skipped; the rest are still written.
pub fn grasp(store: &Store, pairs: &KeyValues) -> GraspReport {
    let mut report = GraspReport::default();

    for (key, value) in pairs.iter() {
        let result = store.batch(|tx| {
            let mut bucket = tx.create_bucket_if_not_exists(FLAT_BUCKET)?;
            bucket.put(key.as_bytes(), value.as_bytes())
        });

        match result {
            Ok(()) => report.stored += 1,
            Err(e) => {
                tracing::warn!(
                    "monkey won't grasp {} at {}: {}",
                    key,
                    store.path().display(),
                    e
                );
                report.failed += 1;
            }
        }
    }

    report
}

/// Look up every key in one read transaction, returning values in request
/// order.
///
/// A missing flat bucket or any missing key fails the whole lookup.
pub fn deliver(store: &Store, keys: &[String]) -> Result<Vec<Vec<u8>>> {
    store.view(|tx| {
        let bucket = tx
            .bucket(FLAT_BUCKET)
            .ok_or_else(|| MonkeyError::MalformedStore(store.path().to_path_buf()))?;

        keys.iter()
            .map(|key| {
                bucket
                    .get(key.as_bytes())
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| MonkeyError::KeyNotFound(key.clone()))
            })
            .collect()
    })
}

/// Delete every key in one write transaction; returns how many were present.
///
/// Absent keys are skipped. A missing flat bucket is an error.
pub fn hurl(store: &Store, keys: &[String]) -> Result<usize> {
    store.update(|tx| {
        let mut bucket = tx
            .bucket_mut(FLAT_BUCKET)
            .ok_or_else(|| MonkeyError::MalformedStore(store.path().to_path_buf()))?;

        let mut removed = 0;
        for key in keys {
            if bucket.get(key.as_bytes()).is_some() {
                removed += 1;
            }
            bucket.delete(key.as_bytes())?;
        }
        Ok(removed)
    })
}
