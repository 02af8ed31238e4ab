//! Timestamped CSV archiving
//!
//! An [`Archiver`] owns one CSV file and appends one serialised record per
//! call, stamped with the time it was taken.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>
}

#[derive(Serialize)]
struct Record<'a, T: Serialize> {
    time_s: f64,
    name: &'a str,
    data: T
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors that can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive file: {0}")]
    FlushError(std::io::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        Self::create(session_path)
    }

    /// Create a new archiver writing to exactly the given file.
    ///
    /// The file is truncated if it exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(ArchiveError::CreateError)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
            .map_err(ArchiveError::CreateError)?;

        // Records carry a variable number of fields (scalars vs arrays)
        let writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        Ok(Self { writer })
    }

    /// Serialise a named record into the archive at the given time.
    pub fn serialise<T: Serialize>(
        &mut self, time_s: f64, name: &str, data: T
    ) -> Result<(), ArchiveError> {
        self.writer
            .serialize(Record { time_s, name, data })
            .map_err(ArchiveError::WriteError)?;

        Ok(())
    }

    /// Flush all buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}
