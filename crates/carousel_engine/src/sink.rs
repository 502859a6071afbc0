use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use carousel_core::HarvestedImage;

use crate::persist::{AtomicFileWriter, PersistError};

/// A stored carousel entry. Positions are dense and start at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedImage {
    pub image_url: String,
    pub manifest_url: String,
    #[serde(default)]
    pub related_url: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    pub position: u32,
    pub created: DateTime<Utc>,
}

impl SelectedImage {
    pub fn new(position: u32, image: HarvestedImage, created: DateTime<Utc>) -> Self {
        Self {
            image_url: image.image_url,
            manifest_url: image.manifest_url,
            related_url: image.related_url,
            label: image.label,
            position,
            created,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("io error reading {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination of a finished run. `replace_all` swaps the whole result set.
pub trait ResultSink: Send {
    fn replace_all(&mut self, records: &[SelectedImage]) -> Result<(), SinkError>;
}

/// Keeps results in memory; counts replacements.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<SelectedImage>,
    replacements: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SelectedImage>) -> Self {
        Self {
            records,
            replacements: 0,
        }
    }

    pub fn records(&self) -> &[SelectedImage] {
        &self.records
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl ResultSink for MemorySink {
    fn replace_all(&mut self, records: &[SelectedImage]) -> Result<(), SinkError> {
        self.records = records.to_vec();
        self.replacements += 1;
        Ok(())
    }
}

/// Stores results as a pretty-printed JSON array, replaced atomically.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    writer: AtomicFileWriter,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: AtomicFileWriter::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.target()
    }

    /// Reads stored results ordered by position. A missing file means no results yet.
    pub fn load(&self) -> Result<Vec<SelectedImage>, SinkError> {
        load_results(self.path())
    }

    /// When the results were last replaced: the newest `created` stamp, or the
    /// file's modification time when the stored set is empty. `None` if nothing
    /// was ever stored.
    pub fn last_replaced(&self) -> Result<Option<SystemTime>, SinkError> {
        let records = self.load()?;
        if let Some(newest) = records.iter().map(|record| record.created).max() {
            return Ok(Some(SystemTime::from(newest)));
        }
        match fs::metadata(self.path()).and_then(|meta| meta.modified()) {
            Ok(modified) => Ok(Some(modified)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SinkError::Read {
                path: self.path().to_path_buf(),
                source,
            }),
        }
    }
}

impl ResultSink for JsonFileSink {
    fn replace_all(&mut self, records: &[SelectedImage]) -> Result<(), SinkError> {
        let mut body = serde_json::to_vec_pretty(records)?;
        body.push(b'\n');
        self.writer.write(&body)?;
        Ok(())
    }
}

pub fn load_results(path: &Path) -> Result<Vec<SelectedImage>, SinkError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SinkError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut records: Vec<SelectedImage> = serde_json::from_slice(&raw)?;
    records.sort_by_key(|record| record.position);
    Ok(records)
}
