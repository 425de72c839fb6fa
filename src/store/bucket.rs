//! Bucket tree
//!
//! In-memory form of the store: a tree of buckets whose entries are either
//! leaf values or nested buckets, ordered by key.
//!
//! Sub-buckets and values sit behind `Arc`s so a write transaction can copy
//! the root cheaply and only clones the nodes along the paths it touches.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{MonkeyError, Result};
use super::log::Operation;

/// One bucket's contents
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    entries: BTreeMap<Vec<u8>, Slot>,
}

/// What a key maps to: exactly one of a leaf or a sub-bucket
#[derive(Debug, Clone)]
enum Slot {
    Leaf(Arc<[u8]>),
    Bucket(Arc<Node>),
}

impl Node {
    fn leaf(&self, key: &[u8]) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(Slot::Leaf(value)) => Some(&value[..]),
            _ => None,
        }
    }

    fn child(&self, name: &[u8]) -> Option<&Node> {
        match self.entries.get(name) {
            Some(Slot::Bucket(node)) => Some(node.as_ref()),
            _ => None,
        }
    }

    fn child_mut(&mut self, name: &[u8]) -> Option<&mut Node> {
        match self.entries.get_mut(name) {
            Some(Slot::Bucket(node)) => Some(Arc::make_mut(node)),
            _ => None,
        }
    }

    /// Walk down `path` from this node
    fn descend_mut(&mut self, path: &[Vec<u8>]) -> Option<&mut Node> {
        let mut node = self;
        for name in path {
            node = node.child_mut(name)?;
        }
        Some(node)
    }

    /// Get or create the sub-bucket `name`; the flag is true when created
    fn ensure_bucket(&mut self, name: &[u8]) -> Result<(&mut Node, bool)> {
        if name.is_empty() {
            return Err(MonkeyError::EmptyKey);
        }
        let mut created = false;
        let slot = self.entries.entry(name.to_vec()).or_insert_with(|| {
            created = true;
            Slot::Bucket(Arc::default())
        });
        match slot {
            Slot::Bucket(node) => Ok((Arc::make_mut(node), created)),
            Slot::Leaf(_) => Err(MonkeyError::IncompatibleValue(format!(
                "{} is a value, not a bucket",
                String::from_utf8_lossy(name)
            ))),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(MonkeyError::EmptyKey);
        }
        if let Some(Slot::Bucket(_)) = self.entries.get(key) {
            return Err(MonkeyError::IncompatibleValue(format!(
                "{} is a bucket, not a value",
                String::from_utf8_lossy(key)
            )));
        }
        self.entries.insert(key.to_vec(), Slot::Leaf(Arc::from(value)));
        Ok(())
    }

    /// Remove a leaf; returns whether it was present
    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        match self.entries.get(key) {
            None => Ok(false),
            Some(Slot::Bucket(_)) => Err(MonkeyError::IncompatibleValue(format!(
                "{} is a bucket, not a value",
                String::from_utf8_lossy(key)
            ))),
            Some(Slot::Leaf(_)) => {
                self.entries.remove(key);
                Ok(true)
            }
        }
    }

    /// Remove a sub-bucket and its subtree; returns whether it was present
    fn remove_bucket(&mut self, name: &[u8]) -> Result<bool> {
        match self.entries.get(name) {
            None => Ok(false),
            Some(Slot::Leaf(_)) => Err(MonkeyError::IncompatibleValue(format!(
                "{} is a value, not a bucket",
                String::from_utf8_lossy(name)
            ))),
            Some(Slot::Bucket(_)) => {
                self.entries.remove(name);
                Ok(true)
            }
        }
    }

    /// Replay one logged change against this (root) node
    pub(crate) fn apply(&mut self, operation: &Operation) -> Result<()> {
        let missing = |path: &[Vec<u8>]| {
            MonkeyError::StoreCorrupted(format!(
                "log refers to missing bucket {}",
                display_path(path)
            ))
        };

        match operation {
            Operation::CreateBucket { path } => {
                let (name, parent) = path
                    .split_last()
                    .ok_or_else(|| MonkeyError::StoreCorrupted("log creates the root".to_string()))?;
                let node = self.descend_mut(parent).ok_or_else(|| missing(parent))?;
                node.ensure_bucket(name)
                    .map_err(|e| MonkeyError::StoreCorrupted(e.to_string()))?;
            }
            Operation::Put { path, key, value } => {
                if path.is_empty() {
                    return Err(MonkeyError::StoreCorrupted(
                        "log puts a value at the root".to_string(),
                    ));
                }
                let node = self.descend_mut(path).ok_or_else(|| missing(path.as_slice()))?;
                node.put(key, value)
                    .map_err(|e| MonkeyError::StoreCorrupted(e.to_string()))?;
            }
            Operation::Delete { path, key } => {
                let node = self.descend_mut(path).ok_or_else(|| missing(path.as_slice()))?;
                node.delete(key)
                    .map_err(|e| MonkeyError::StoreCorrupted(e.to_string()))?;
            }
            Operation::DeleteBucket { path } => {
                let (name, parent) = path
                    .split_last()
                    .ok_or_else(|| MonkeyError::StoreCorrupted("log deletes the root".to_string()))?;
                let node = self.descend_mut(parent).ok_or_else(|| missing(parent))?;
                node.remove_bucket(name)
                    .map_err(|e| MonkeyError::StoreCorrupted(e.to_string()))?;
            }
        }
        Ok(())
    }
}

fn display_path(path: &[Vec<u8>]) -> String {
    path.iter()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

// =============================================================================
// Read Handles
// =============================================================================

/// Read-only view of a bucket, valid for the life of its transaction
#[derive(Debug, Clone, Copy)]
pub struct Bucket<'tx> {
    node: &'tx Node,
}

/// One direct entry of a bucket
#[derive(Debug, Clone, Copy)]
pub enum Entry<'tx> {
    Leaf { key: &'tx [u8], value: &'tx [u8] },
    Bucket { key: &'tx [u8], bucket: Bucket<'tx> },
}

impl<'tx> Entry<'tx> {
    pub fn key(&self) -> &'tx [u8] {
        match self {
            Entry::Leaf { key, .. } | Entry::Bucket { key, .. } => *key,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Entry::Leaf { .. })
    }
}

impl<'tx> Bucket<'tx> {
    pub(crate) fn new(node: &'tx Node) -> Self {
        Self { node }
    }

    /// Leaf value under `key`; `None` if absent or a sub-bucket
    pub fn get(&self, key: &[u8]) -> Option<&'tx [u8]> {
        self.node.leaf(key)
    }

    /// Sub-bucket under `name`; `None` if absent or a leaf
    pub fn bucket(&self, name: &[u8]) -> Option<Bucket<'tx>> {
        self.node.child(name).map(Bucket::new)
    }

    /// Direct entries in key order
    pub fn entries(&self) -> Entries<'tx> {
        Entries {
            inner: self.node.entries.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.node.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.entries.is_empty()
    }
}

/// Iterator over a bucket's direct entries
pub struct Entries<'tx> {
    inner: btree_map::Iter<'tx, Vec<u8>, Slot>,
}

impl<'tx> Iterator for Entries<'tx> {
    type Item = Entry<'tx>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, slot)| match slot {
            Slot::Leaf(value) => Entry::Leaf {
                key: key.as_slice(),
                value: &value[..],
            },
            Slot::Bucket(node) => Entry::Bucket {
                key: key.as_slice(),
                bucket: Bucket::new(node.as_ref()),
            },
        })
    }
}

// =============================================================================
// Write Handles
// =============================================================================

/// Writable view of a bucket inside a write transaction.
///
/// Every successful change is recorded so the transaction can log it on
/// commit.
pub struct BucketMut<'tx> {
    node: &'tx mut Node,
    path: Vec<Vec<u8>>,
    ops: &'tx mut Vec<Operation>,
}

impl<'tx> BucketMut<'tx> {
    pub(crate) fn new(node: &'tx mut Node, path: Vec<Vec<u8>>, ops: &'tx mut Vec<Operation>) -> Self {
        Self { node, path, ops }
    }

    /// Set `key` to `value`, overwriting any previous value
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.node.put(key, value)?;
        self.ops.push(Operation::Put {
            path: self.path.clone(),
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Delete a leaf. Absent keys are not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if self.node.delete(key)? {
            self.ops.push(Operation::Delete {
                path: self.path.clone(),
                key: key.to_vec(),
            });
        }
        Ok(())
    }

    /// Leaf value under `key`, including this transaction's changes
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.node.leaf(key)
    }

    /// Read-only view of this bucket
    pub fn as_bucket(&self) -> Bucket<'_> {
        Bucket::new(self.node)
    }

    /// Get or create the sub-bucket `name`
    pub fn create_bucket_if_not_exists(&mut self, name: &[u8]) -> Result<BucketMut<'_>> {
        ensure_child(self.node, &self.path, self.ops, name)
    }

    /// Delete the sub-bucket `name` with everything under it.
    /// Absent buckets are not an error.
    pub fn delete_bucket(&mut self, name: &[u8]) -> Result<()> {
        remove_child(self.node, &self.path, self.ops, name)
    }

    /// Existing sub-bucket `name`, if any
    pub fn bucket_mut(&mut self, name: &[u8]) -> Option<BucketMut<'_>> {
        let mut path = self.path.clone();
        path.push(name.to_vec());
        let node = self.node.child_mut(name)?;
        Some(BucketMut::new(node, path, self.ops))
    }
}

pub(crate) fn ensure_child<'a>(
    parent: &'a mut Node,
    parent_path: &[Vec<u8>],
    ops: &'a mut Vec<Operation>,
    name: &[u8],
) -> Result<BucketMut<'a>> {
    let mut path = parent_path.to_vec();
    path.push(name.to_vec());

    let (node, created) = parent.ensure_bucket(name)?;
    if created {
        ops.push(Operation::CreateBucket { path: path.clone() });
    }
    Ok(BucketMut::new(node, path, ops))
}

pub(crate) fn remove_child(
    parent: &mut Node,
    parent_path: &[Vec<u8>],
    ops: &mut Vec<Operation>,
    name: &[u8],
) -> Result<()> {
    if parent.remove_bucket(name)? {
        let mut path = parent_path.to_vec();
        path.push(name.to_vec());
        ops.push(Operation::DeleteBucket { path });
    }
    Ok(())
}
