//! Error types for archive operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::DescriptorError;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while building or reading archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Failed to open or read a source file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Failed to read a stream source for an entry.
    #[error("failed to read stream for entry '{entry}': {source}")]
    StreamFailed { entry: String, source: io::Error },

    /// Failed to list a directory source.
    #[error("failed to list directory '{dir}': {source}")]
    ListFailed { dir: String, source: io::Error },

    /// Failed to write entry content into the archive sink.
    #[error("failed to write archive: {0}")]
    SinkFailed(io::Error),

    /// The archive data is malformed or could not be decoded.
    #[error("malformed archive: {0}")]
    Malformed(#[from] zip::result::ZipError),

    /// An entry with this name was already added.
    #[error("duplicate archive entry '{0}'")]
    DuplicateEntry(String),

    /// An entry name would resolve outside the extraction directory.
    #[error("unsafe archive entry name '{0}'")]
    UnsafeEntryName(String),

    /// The directory to add is not located under the given base directory.
    #[error("{} is not inside base directory {}", dir.display(), base.display())]
    InvalidBase { dir: PathBuf, base: PathBuf },

    /// A deployment descriptor inside the archive could not be parsed.
    #[error("invalid descriptor '{entry}': {source}")]
    Descriptor {
        entry: String,
        source: DescriptorError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failed_display() {
        let err = ArchiveError::ReadFailed {
            path: PathBuf::from("/tmp/app.war"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "failed to read /tmp/app.war: not found");
    }

    #[test]
    fn test_duplicate_entry_display() {
        let err = ArchiveError::DuplicateEntry("webapp.war".to_string());
        assert!(err.to_string().contains("webapp.war"));
    }
}
