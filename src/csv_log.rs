//! Comma-delimited run logs with an optional header row.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// How the log file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Truncate or create.
    #[default]
    Write,
    /// Append to an existing file, creating it if needed.
    Append,
}

/// An open CSV log.
///
/// The file is flushed and closed when the handle is dropped, including
/// when the owning scope unwinds. Not meant to be shared between writers.
pub struct CsvFile {
    writer: csv::Writer<File>,
    path: PathBuf,
    header: Option<Vec<String>>,
}

impl CsvFile {
    /// Open `file_name` (joined onto `work_dir` when given) and write `header` if provided.
    pub fn create(
        file_name: impl AsRef<Path>,
        work_dir: Option<&Path>,
        header: Option<&[&str]>,
        mode: OpenMode,
    ) -> Result<Self> {
        let path = match work_dir {
            Some(dir) => dir.join(file_name),
            None => file_name.as_ref().to_path_buf(),
        };

        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
        };
        let file = options
            .open(&path)
            .with_context(|| format!("failed to open csv log at {}", path.display()))?;

        let writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        let mut csv_file = Self {
            writer,
            path,
            header: header.map(|h| h.iter().map(|s| s.to_string()).collect()),
        };
        if let Some(columns) = header {
            csv_file.writerow(columns, false)?;
        }
        debug!(path = %csv_file.path.display(), ?mode, "opened csv log");
        Ok(csv_file)
    }

    /// Append one row, flushing to disk immediately when `flush` is set.
    pub fn writerow<I, T>(&mut self, row: I, flush: bool) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        let record: Vec<String> = row.into_iter().map(|v| v.to_string()).collect();
        self.writer
            .write_record(&record)
            .with_context(|| format!("failed to write row to {}", self.path.display()))?;
        if flush {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CsvFile {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!(path = %self.path.display(), err = %e, "failed to flush csv log on close");
        }
    }
}
