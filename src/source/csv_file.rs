use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use super::naming::normalize_columns;
use super::{SourceError, SourceResult};

#[derive(Debug, Clone)]
pub struct CsvSourceOptions {
    pub delimiter: u8,
    /// Explicit column names; when set the first line is data unless
    /// `skip_header` is also set.
    pub fields: Option<Vec<String>>,
    pub skip_header: bool,
}

impl Default for CsvSourceOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            fields: None,
            skip_header: false,
        }
    }
}

/// One parsed record and the line it started on.
#[derive(Debug, Clone)]
pub struct CsvRecord {
    pub line: u64,
    pub record: StringRecord,
}

impl CsvRecord {
    pub fn values(&self) -> Vec<&str> {
        self.record.iter().collect()
    }
}

/// CSV rows with column names resolved up front.
pub struct CsvSource<R: Read> {
    reader: csv::Reader<R>,
    columns: Vec<String>,
    record: StringRecord,
}

impl CsvSource<File> {
    pub fn open(path: &Path, options: CsvSourceOptions) -> SourceResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, options)
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(reader: R, options: CsvSourceOptions) -> SourceResult<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut record = StringRecord::new();
        let columns = match options.fields {
            Some(fields) => {
                if options.skip_header {
                    reader.read_record(&mut record)?;
                }
                normalize_columns(&fields)
            }
            None => {
                if !reader.read_record(&mut record)? {
                    return Err(SourceError::MissingHeader);
                }
                let header: Vec<&str> = record.iter().collect();
                normalize_columns(&header)
            }
        };

        if columns.is_empty() {
            return Err(SourceError::MissingHeader);
        }

        Ok(Self {
            reader,
            columns,
            record: StringRecord::new(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Next record, `None` at end of input.
    ///
    /// Parse failures are returned per record so callers can skip them;
    /// rows of the wrong width are not rejected here.
    pub fn next_record(&mut self) -> Option<SourceResult<CsvRecord>> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let line = self
                    .record
                    .position()
                    .map(|position| position.line())
                    .unwrap_or_default();
                Some(Ok(CsvRecord {
                    line,
                    record: self.record.clone(),
                }))
            }
            Ok(false) => None,
            Err(err) => Some(Err(SourceError::Csv(err))),
        }
    }
}
