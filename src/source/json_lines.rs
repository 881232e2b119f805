use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::IgnoredAny;

use super::{SourceError, SourceResult};

/// One JSON document and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonLine {
    pub line: u64,
    pub text: String,
}

/// Newline delimited JSON, validated one document per line.
///
/// Blank lines are skipped. Documents are passed on as written, not
/// re-serialized.
pub struct JsonLines<R: BufRead> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
}

impl JsonLines<BufReader<File>> {
    pub fn open(path: &Path) -> SourceResult<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> JsonLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for JsonLines<R> {
    type Item = SourceResult<JsonLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(err) => return Some(Err(SourceError::Io(err))),
            }

            let text = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim(),
                Err(_) => return Some(Err(SourceError::InvalidEncoding { line: self.line })),
            };
            if text.is_empty() {
                continue;
            }

            return Some(match serde_json::from_str::<IgnoredAny>(text) {
                Ok(_) => Ok(JsonLine {
                    line: self.line,
                    text: text.to_string(),
                }),
                Err(source) => Err(SourceError::InvalidJson {
                    line: self.line,
                    source,
                }),
            });
        }
    }
}
