//! Result sinks
//!
//! A sink receives the full set of page records once a crawl has finished.

use crate::output::PageRecord;
use crate::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Destination for finished crawl results
pub trait ResultSink {
    /// Writes all records, replacing anything written before
    fn persist(&self, records: &[PageRecord]) -> Result<()>;
}

/// Writes records as a pretty-printed JSON array
///
/// The file is written to a temporary file in the destination directory and
/// renamed into place, so readers see either the old or the new contents.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonFileSink {
    fn persist(&self, records: &[PageRecord]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, records)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;

        tracing::info!(
            "Saved {} results to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}
