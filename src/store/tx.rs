//! Transactions
//!
//! A read transaction pins an immutable snapshot of the bucket tree. A write
//! transaction edits a private copy and records each change for the log.

use std::sync::Arc;

use crate::error::Result;
use super::bucket::{ensure_child, remove_child, Bucket, BucketMut, Entry, Node};
use super::log::Operation;

/// Read-only transaction over a consistent snapshot
pub struct ReadTx {
    root: Arc<Node>,
}

impl ReadTx {
    pub(crate) fn new(root: Arc<Node>) -> Self {
        Self { root }
    }

    /// Names of the top-level buckets, in key order
    pub fn buckets(&self) -> impl Iterator<Item = &[u8]> + '_ {
        Bucket::new(&self.root)
            .entries()
            .filter(|entry| !entry.is_leaf())
            .map(|entry| entry.key())
    }

    /// Top-level bucket by name
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'_>> {
        Bucket::new(&self.root).bucket(name)
    }

    /// Walk down a chain of bucket names
    pub fn bucket_at(&self, path: &[&[u8]]) -> Option<Bucket<'_>> {
        let mut bucket = Bucket::new(&self.root);
        for name in path {
            bucket = bucket.bucket(name)?;
        }
        Some(bucket)
    }
}

/// Write transaction over a private copy of the tree
pub struct WriteTx {
    root: Node,
    ops: Vec<Operation>,
}

impl WriteTx {
    pub(crate) fn new(root: Node) -> Self {
        Self {
            root,
            ops: Vec::new(),
        }
    }

    /// Get or create a top-level bucket
    pub fn create_bucket_if_not_exists(&mut self, name: &[u8]) -> Result<BucketMut<'_>> {
        ensure_child(&mut self.root, &[], &mut self.ops, name)
    }

    /// Delete a top-level bucket with everything under it.
    /// Absent buckets are not an error.
    pub fn delete_bucket(&mut self, name: &[u8]) -> Result<()> {
        remove_child(&mut self.root, &[], &mut self.ops, name)
    }

    /// Existing top-level bucket, writable
    pub fn bucket_mut(&mut self, name: &[u8]) -> Option<BucketMut<'_>> {
        let root = Bucket::new(&self.root);
        if root.bucket(name).is_none() {
            return None;
        }
        ensure_child(&mut self.root, &[], &mut self.ops, name).ok()
    }

    /// Existing top-level bucket, read-only, including this transaction's changes
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'_>> {
        Bucket::new(&self.root).bucket(name)
    }

    /// Top-level bucket names, including this transaction's changes
    pub fn buckets(&self) -> Vec<Vec<u8>> {
        Bucket::new(&self.root)
            .entries()
            .filter_map(|entry| match entry {
                Entry::Bucket { key, .. } => Some(key.to_vec()),
                Entry::Leaf { .. } => None,
            })
            .collect()
    }

    /// Changes recorded so far
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub(crate) fn into_parts(self) -> (Node, Vec<Operation>) {
        (self.root, self.ops)
    }
}
