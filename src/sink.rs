//! CSV output written all-or-nothing.
//!
//! Rows go to a `.partial` file next to the destination. Only `commit` renames
//! it into place; dropping an uncommitted writer deletes the partial file, so a
//! failed run never leaves a truncated CSV behind.

use crate::error::Result;
use crate::types::{OutputRecord, RecordSink};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct CsvFileWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    writer: Option<csv::Writer<BufWriter<File>>>,
    rows: u64,
}

impl CsvFileWriter {
    /// Create the partial file and write the header row.
    pub fn create(path: &Path, header: &[&str]) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file_name = path.file_name().unwrap_or_default().to_os_string();
        file_name.push(".partial");
        let temp_path = path.with_file_name(file_name);

        let file = File::create(&temp_path)?;
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(BufWriter::new(file));
        writer.write_record(header)?;

        debug!(path = %temp_path.display(), "Opened partial output");

        Ok(Self {
            final_path: path.to_path_buf(),
            temp_path,
            writer: Some(writer),
            rows: 0,
        })
    }

    pub fn write_row<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "writer already closed"))?;
        writer.write_record(fields)?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far (header excluded).
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush everything and move the file to its final path.
    pub fn commit(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            let buffered = writer
                .into_inner()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            let file = buffered
                .into_inner()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&self.temp_path, &self.final_path) {
            let _ = fs::remove_file(&self.temp_path);
            return Err(e.into());
        }
        debug!(path = %self.final_path.display(), rows = self.rows, "Committed output");
        Ok(self.final_path.clone())
    }
}

impl RecordSink for CsvFileWriter {
    fn emit(&mut self, record: &OutputRecord) -> Result<()> {
        self.write_row(record.to_row())
    }
}

impl Drop for CsvFileWriter {
    fn drop(&mut self) {
        // writer is only still present when commit() was never reached
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.temp_path) {
                warn!(path = %self.temp_path.display(), error = %e, "Failed to remove partial output");
            }
        }
    }
}

/// Hex SHA-256 of a file's contents.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
