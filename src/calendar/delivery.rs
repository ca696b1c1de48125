//! Handing a finished calendar document to the user

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

pub const DEFAULT_FILENAME: &str = "planning-bob.ics";
pub const MIME_TYPE: &str = "text/calendar; charset=utf-8";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Invalid file name: {0:?}")]
    InvalidFilename(String),
    #[error("Failed to write calendar file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to persist calendar file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// `Content-Disposition` value offering `filename` as a download.
pub fn attachment_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// Writes calendar documents into a fixed directory
///
/// Each delivery goes through a temporary file in the target directory
/// that is renamed into place, so readers never see a partial file. The
/// temporary file is removed on every failure path.
#[derive(Debug, Clone)]
pub struct FileDelivery {
    dir: PathBuf,
}

impl FileDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deliver `document` as `filename` (default `planning-bob.ics`).
    pub fn deliver(&self, document: &str, filename: Option<&str>) -> Result<PathBuf, DeliveryError> {
        let filename = filename.unwrap_or(DEFAULT_FILENAME);
        validate_filename(filename)?;

        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(filename);

        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(document.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&target)?;

        tracing::info!(path = %target.display(), bytes = document.len(), "Calendar delivered");
        Ok(target)
    }
}

fn validate_filename(filename: &str) -> Result<(), DeliveryError> {
    let is_plain = Path::new(filename).file_name().and_then(|n| n.to_str()) == Some(filename);
    if filename.is_empty() || !is_plain {
        return Err(DeliveryError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}
