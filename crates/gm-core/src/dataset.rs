//! Labeled dataset records.
//!
//! A dataset is JSON Lines, one person per line:
//!
//! ```text
//! {"label": "resident", "observations": ["46.51,6.63", "46.52,6.64"]}
//! {"label": "visitor", "observations": []}
//! ```
//!
//! Blank lines are skipped. A line that is not a valid record is a hard
//! error carrying its 1-based line number.

use gm_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One labeled record of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Ground-truth class label.
    pub label: String,

    /// Raw observations in the order they were made.
    #[serde(default)]
    pub observations: Vec<String>,

    /// 1-based source line (0 for records built in memory).
    #[serde(skip)]
    pub line: usize,
}

impl Record {
    pub fn new<S: Into<String>>(label: S, observations: Vec<String>) -> Self {
        Self {
            label: label.into(),
            observations,
            line: 0,
        }
    }
}

/// A stream of labeled records.
pub trait RecordSource {
    /// Next record, or None when the source is exhausted.
    fn next_record(&mut self) -> Result<Option<Record>>;
}

impl RecordSource for std::vec::IntoIter<Record> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.next())
    }
}

/// Reads JSON Lines records from any buffered reader.
#[derive(Debug)]
pub struct JsonlRecordReader<B> {
    reader: B,
    line: usize,
    buf: String,
}

impl<B: BufRead> JsonlRecordReader<B> {
    pub fn new(reader: B) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<B: BufRead> RecordSource for JsonlRecordReader<B> {
    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return parse_record(text, self.line).map(Some);
        }
    }
}

/// Parse one dataset line.
pub fn parse_record(text: &str, line: usize) -> Result<Record> {
    let mut record: Record = serde_json::from_str(text).map_err(|e| Error::Parse {
        line,
        message: e.to_string(),
    })?;
    record.line = line;
    Ok(record)
}

/// Open a dataset file for streaming.
pub fn open_dataset(path: &Path) -> Result<JsonlRecordReader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(JsonlRecordReader::new(BufReader::new(file)))
}
