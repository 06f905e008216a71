//! Streaming CSV ingest for contact files.
//!
//! A `ContactReader` yields one `Record` per data row in file order, keyed by
//! the header row. The first malformed row ends the stream.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::format::Record;

/// File name used when a request does not name one.
pub const DEFAULT_CONTACTS_FILE: &str = "contatos.csv";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Arquivo {0} não encontrado")]
    NotFound(String),

    #[error("Erro ao ler CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),
}

/// Lazy, single-pass reader over a contacts CSV file.
pub struct ContactReader {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<File>,
    rows_read: usize,
    failed: bool,
}

impl ContactReader {
    /// Open `path` and read its header row.
    ///
    /// Fails with `NotFound` before any row is read if the file is missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IngestError::NotFound(path.display().to_string()),
            _ => IngestError::Io(e),
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        info!(path = %path.display(), "csv_ingest_opened");

        Ok(Self {
            headers,
            records: reader.into_records(),
            rows_read: 0,
            failed: false,
        })
    }

    /// Column names from the header row.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Drain the reader, stopping at the first malformed row.
    pub fn read_all(self) -> Result<Vec<Record>, IngestError> {
        self.collect()
    }
}

impl Iterator for ContactReader {
    type Item = Result<Record, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match self.records.next()? {
            Ok(row) => {
                self.rows_read += 1;
                let record = self
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(key, value)| (key.clone(), Value::String(value.to_string())))
                    .collect();
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                warn!(
                    rows_read = self.rows_read,
                    error = %e,
                    "csv_ingest_row_failed"
                );
                Some(Err(e.into()))
            }
        }
    }
}

/// Resolve a request-supplied file name inside `data_dir`.
///
/// Only bare file names are accepted; anything that could escape the
/// directory yields `None`.
pub fn resolve_data_file(data_dir: impl AsRef<Path>, filename: &str) -> Option<PathBuf> {
    let name = filename.trim();
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return None;
    }
    Some(data_dir.as_ref().join(name))
}
