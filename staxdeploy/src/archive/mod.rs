//! Zip archive assembly and extraction.
//!
//! This module provides:
//! - Archive building from files, streams and directory trees (`builder`)
//! - Directory sources for the builder, on disk or in memory (`source`)
//! - Sequential entry streaming and extraction (`reader`)
//!
//! Entry names always use `/` separators. Directory marker entries end with
//! `/` and carry no content.

mod builder;
mod error;
mod reader;
mod source;

pub use builder::{ArchiveBuilder, TRANSFER_CHUNK_SIZE};
pub use error::{ArchiveError, ArchiveResult};
pub use reader::{
    extract_all, extract_all_from_file, extract_entry, for_each_entry, for_each_entry_in_file,
    list_entries, list_entries_in_file,
};
pub use source::{DirectorySource, FsDirectory, MemoryDirectory, NodeKind, SourceNode};

/// Kind of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with content.
    File,
    /// Directory marker (name ends with `/`, no content).
    Directory,
}

/// Metadata for a single archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Slash-separated entry name.
    pub name: String,
    /// Whether the entry is a file or a directory marker.
    pub kind: EntryKind,
    /// Uncompressed size in bytes (0 for directory markers).
    pub size: u64,
}

impl EntryInfo {
    /// Whether this entry is a directory marker.
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
