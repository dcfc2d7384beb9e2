//! Durable mirror of the token cache.
//!
//! This module owns the single on-disk file that lets independently started
//! CLI processes share one authentication token. The file holds one
//! bincode-encoded [`TokenRecord`]. It is not a public format and is only
//! guaranteed to round-trip within one build.

use crate::token::TokenRecord;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::trace;

/// Default cache file name, resolved against the process working directory
pub const DEFAULT_TOKEN_CACHE_FILE_NAME: &str = ".k5-token.bin";

/// Error type for disk cache operations
#[derive(Debug)]
pub enum CacheError {
    IoError(std::io::Error),
    SerializationError(bincode::Error),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::IoError(e) => write!(f, "IO error: {}", e),
            CacheError::SerializationError(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::IoError(e) => Some(e),
            CacheError::SerializationError(e) => Some(e.as_ref()),
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(error: std::io::Error) -> Self {
        CacheError::IoError(error)
    }
}

impl From<bincode::Error> for CacheError {
    fn from(error: bincode::Error) -> Self {
        CacheError::SerializationError(error)
    }
}

/// The on-disk token file.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record.
    ///
    /// # Returns
    /// * `Ok(Some(TokenRecord))` - The file exists and decoded cleanly
    /// * `Ok(None)` - There is no file
    /// * `Err` - The file could not be read or holds something other than a record
    pub fn read(&self) -> Result<Option<TokenRecord>, CacheError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        trace!("Read {} bytes from {:?}", data.len(), self.path);

        let record: TokenRecord = bincode::deserialize(&data)?;
        Ok(Some(record))
    }

    /// Replace the file with `record`.
    ///
    /// The bytes go to a temporary sibling first and are renamed over the
    /// target, so a concurrent reader sees either the old or the new file.
    pub fn write(&self, record: &TokenRecord) -> Result<(), CacheError> {
        let data = bincode::serialize(record)?;

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        let mut file = NamedTempFile::new_in(&directory)?;
        file.write_all(&data)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| CacheError::IoError(e.error))?;

        trace!("Wrote {} bytes to {:?}", data.len(), self.path);
        Ok(())
    }

    /// Delete the file. Returns whether there was one.
    pub fn remove(&self) -> Result<bool, CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for TokenFile {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_CACHE_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> TokenRecord {
        TokenRecord::new(
            "ed0456b9f91041e88db9163e7cf88043".to_string(),
            Some("2017-05-02T06:11:58.198552Z".to_string()),
            Some("2017-05-02T09:11:58.198526Z".to_string()),
        )
    }

    #[test]
    fn test_write_then_read_returns_same_record() {
        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("token.bin"));

        file.write(&sample()).unwrap();
        assert_eq!(file.read().unwrap(), Some(sample()));
    }

    #[test]
    fn test_record_without_timestamps_round_trips() {
        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("token.bin"));
        let record = TokenRecord::new("bare".to_string(), None, None);

        file.write(&record).unwrap();
        assert_eq!(file.read().unwrap(), Some(record));
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("absent.bin"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.bin");
        fs::write(&path, [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]).unwrap();

        let result = TokenFile::new(&path).read();
        assert!(matches!(result, Err(CacheError::SerializationError(_))));
    }

    #[test]
    fn test_write_creates_parent_directories_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("nested").join("deeper").join("token.bin"));

        file.write(&sample()).unwrap();
        let replacement = TokenRecord::new("second".to_string(), None, None);
        file.write(&replacement).unwrap();

        assert_eq!(file.read().unwrap(), Some(replacement));
    }

    #[test]
    fn test_remove_reports_whether_file_existed() {
        let dir = TempDir::new().unwrap();
        let file = TokenFile::new(dir.path().join("token.bin"));

        assert!(!file.remove().unwrap());
        file.write(&sample()).unwrap();
        assert!(file.remove().unwrap());
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_default_path_is_relative() {
        assert!(TokenFile::default().path().is_relative());
    }
}
