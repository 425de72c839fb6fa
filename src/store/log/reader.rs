//! Log Reader
//!
//! Handles reading records from the store file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{MonkeyError, Result};
use super::{read_file_header, LogEntry, FILE_HEADER_SIZE, HEADER_SIZE, MAX_RECORD_SIZE};

/// Outcome of reading one record
#[derive(Debug)]
pub enum Frame {
    /// A valid record
    Entry(LogEntry),

    /// Clean end of file
    End,

    /// The file ends partway through a record
    Partial,

    /// A complete record that failed validation
    Corrupt(String),
}

/// Reads records from the store file
pub struct LogReader {
    reader: BufReader<File>,

    /// Byte offset just past the last complete valid record
    position: u64,
}

impl LogReader {
    /// Open a store file for reading, validating its header
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let position = if read_file_header(&mut file)? {
            FILE_HEADER_SIZE
        } else {
            0
        };

        Ok(Self {
            reader: BufReader::new(file),
            position,
        })
    }

    /// Offset just past the last valid record read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next record, classifying anything that is not a valid one
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        let got = read_full(&mut self.reader, &mut header)?;
        if got == 0 {
            return Ok(Frame::End);
        }
        if got < HEADER_SIZE {
            return Ok(Frame::Partial);
        }

        let (_, _, len) = LogEntry::decode_header(&header);
        if len > MAX_RECORD_SIZE {
            return Ok(Frame::Corrupt(format!(
                "record length {} exceeds the {} byte limit",
                len, MAX_RECORD_SIZE
            )));
        }

        let mut record = Vec::with_capacity(HEADER_SIZE + len as usize);
        record.extend_from_slice(&header);
        record.resize(HEADER_SIZE + len as usize, 0);
        let got = read_full(&mut self.reader, &mut record[HEADER_SIZE..])?;
        if got < len as usize {
            return Ok(Frame::Partial);
        }

        match LogEntry::deserialize(&record) {
            Ok(entry) => {
                self.position += record.len() as u64;
                Ok(Frame::Entry(entry))
            }
            Err(MonkeyError::LogCorruption(reason)) => Ok(Frame::Corrupt(reason)),
            Err(e) => Err(e),
        }
    }

    /// Read the next entry from the log.
    ///
    /// A torn or corrupt record is an error here; recovery uses
    /// [`read_frame`](Self::read_frame) to tell them apart.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        match self.read_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Partial => Err(MonkeyError::LogCorruption(format!(
                "incomplete record at offset {}",
                self.position
            ))),
            Frame::Corrupt(reason) => Err(MonkeyError::LogCorruption(reason)),
        }
    }

    /// Iterate over entries until the end of the log or the first bad record
    pub fn entries(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over log entries
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the input allows; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
