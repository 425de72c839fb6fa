//! Log entry definitions
//!
//! A log entry is one committed write transaction.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{MonkeyError, Result};

/// Record header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a record may carry (256 MB)
pub const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// A single committed transaction in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The changes made by the transaction, in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Changes that can be logged.
///
/// `path` is the chain of bucket names from the store root down to the
/// bucket the change applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create the bucket at `path` (its parents already exist)
    CreateBucket { path: Vec<Vec<u8>> },

    /// Put a key-value pair into the bucket at `path`
    Put {
        path: Vec<Vec<u8>>,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key from the bucket at `path`
    Delete { path: Vec<Vec<u8>>, key: Vec<u8> },

    /// Remove the bucket at `path` and everything under it
    DeleteBucket { path: Vec<Vec<u8>> },
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Encode as a full record: header + payload
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_RECORD_SIZE as usize {
            return Err(MonkeyError::Serialization(format!(
                "record of {} bytes exceeds the {} byte limit",
                payload.len(),
                MAX_RECORD_SIZE
            )));
        }

        let crc = crc32fast::hash(&payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode a full record, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MonkeyError::LogCorruption(format!(
                "record header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let (lsn, crc, len) = Self::decode_header(&bytes[..HEADER_SIZE]);
        let end = HEADER_SIZE + len as usize;
        if bytes.len() < end {
            return Err(MonkeyError::LogCorruption(format!(
                "record payload needs {} bytes, got {}",
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        let payload = &bytes[HEADER_SIZE..end];
        let actual = crc32fast::hash(payload);
        if actual != crc {
            return Err(MonkeyError::LogCorruption(format!(
                "CRC mismatch at LSN {}: stored {:08x}, computed {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: LogEntry = bincode::deserialize(payload)
            .map_err(|e| MonkeyError::LogCorruption(format!("undecodable record: {}", e)))?;

        if entry.lsn != lsn {
            return Err(MonkeyError::LogCorruption(format!(
                "header LSN {} disagrees with record LSN {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    /// Split a record header into (lsn, crc, payload length)
    pub fn decode_header(header: &[u8]) -> (u64, u32, u32) {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);
        (
            u64::from_le_bytes(lsn),
            u32::from_le_bytes(crc),
            u32::from_le_bytes(len),
        )
    }
}
