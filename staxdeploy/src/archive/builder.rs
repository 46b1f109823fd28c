//! Archive building from files, streams and directory trees.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{ArchiveError, ArchiveResult};
use super::source::{join_relative, DirectorySource, FsDirectory, NodeKind};

/// Size of the buffer used when copying entry content into the archive (8KB).
pub const TRANSFER_CHUNK_SIZE: usize = 8 * 1024;

/// Sequential zip archive writer.
///
/// Entries are appended in call order. Adding two entries with the same name
/// fails with [`ArchiveError::DuplicateEntry`].
pub struct ArchiveBuilder<W: Write + Seek> {
    writer: ZipWriter<W>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl ArchiveBuilder<BufWriter<File>> {
    /// Create a new archive file at `path`, truncating any existing file.
    pub fn create(path: &Path) -> ArchiveResult<Self> {
        let file = File::create(path).map_err(|e| ArchiveError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Seek> ArchiveBuilder<W> {
    /// Create a builder writing to the given sink.
    pub fn new(sink: W) -> Self {
        Self {
            writer: ZipWriter::new(sink),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            names: HashSet::new(),
        }
    }

    /// Number of entries added so far.
    pub fn entry_count(&self) -> usize {
        self.names.len()
    }

    /// Add the file at `source` as `entry_name`.
    ///
    /// Returns the number of bytes copied.
    pub fn add_file(&mut self, source: &Path, entry_name: &str) -> ArchiveResult<u64> {
        let mut file = File::open(source).map_err(|e| ArchiveError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.start_entry(entry_name)?;
        self.copy_into_entry(&mut file)
            .map_err(|e| match e {
                CopyError::Read(e) => ArchiveError::ReadFailed {
                    path: source.to_path_buf(),
                    source: e,
                },
                CopyError::Write(e) => ArchiveError::SinkFailed(e),
            })
    }

    /// Add the content of `source` as `entry_name`.
    ///
    /// Returns the number of bytes copied.
    pub fn add_stream<R: Read>(&mut self, mut source: R, entry_name: &str) -> ArchiveResult<u64> {
        self.start_entry(entry_name)?;
        self.copy_into_entry(&mut source).map_err(|e| match e {
            CopyError::Read(e) => ArchiveError::StreamFailed {
                entry: entry_name.to_string(),
                source: e,
            },
            CopyError::Write(e) => ArchiveError::SinkFailed(e),
        })
    }

    /// Recursively add the contents of a directory on disk.
    ///
    /// # Arguments
    ///
    /// * `source_dir` - The directory to add
    /// * `base_dir` - Optional ancestor that serves as the entry root; only the
    ///   path after this base becomes part of each entry name. Defaults to
    ///   `source_dir`.
    /// * `name_prefix` - Optional prefix prepended to every entry name
    ///
    /// Hidden files and directories are skipped. Directories without visible
    /// children get an explicit directory marker entry; non-empty directories
    /// are represented by their files' paths.
    ///
    /// # Returns
    ///
    /// The number of entries added.
    pub fn add_directory(
        &mut self,
        source_dir: &Path,
        base_dir: Option<&Path>,
        name_prefix: Option<&str>,
    ) -> ArchiveResult<usize> {
        let base = base_dir.unwrap_or(source_dir);
        let lead = source_dir
            .strip_prefix(base)
            .map_err(|_| ArchiveError::InvalidBase {
                dir: source_dir.to_path_buf(),
                base: base.to_path_buf(),
            })?;

        let lead: Vec<String> = lead
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let mut prefix = name_prefix.unwrap_or("").to_string();
        let is_base = lead.is_empty();
        if !is_base {
            prefix.push_str(&lead.join("/"));
            prefix.push('/');
        }

        let source = FsDirectory::new(source_dir);
        self.add_tree(&source, "", &prefix, is_base)
    }

    /// Recursively add every visible file of a directory source.
    ///
    /// Entry names are `name_prefix` followed by the path relative to the
    /// source root. The root itself never gets a directory marker.
    pub fn add_directory_from(
        &mut self,
        source: &dyn DirectorySource,
        name_prefix: &str,
    ) -> ArchiveResult<usize> {
        self.add_tree(source, "", name_prefix, true)
    }

    /// Finish the archive and return the underlying sink.
    pub fn finish(self) -> ArchiveResult<W> {
        let count = self.names.len();
        let sink = self.writer.finish().map_err(sink_error)?;
        debug!(entries = count, "Archive finished");
        Ok(sink)
    }

    fn add_tree(
        &mut self,
        source: &dyn DirectorySource,
        dir: &str,
        prefix: &str,
        is_base: bool,
    ) -> ArchiveResult<usize> {
        let children: Vec<_> = source
            .children(dir)
            .map_err(|e| ArchiveError::ListFailed {
                dir: dir.to_string(),
                source: e,
            })?
            .into_iter()
            .filter(|node| !node.is_hidden())
            .collect();

        let mut added = 0;

        if children.is_empty() && !is_base {
            let marker = if dir.is_empty() {
                prefix.to_string()
            } else {
                format!("{}{}/", prefix, dir)
            };
            self.add_directory_marker(&marker)?;
            added += 1;
        }

        for node in children {
            let path = join_relative(dir, &node.name);
            match node.kind {
                NodeKind::Directory => {
                    added += self.add_tree(source, &path, prefix, false)?;
                }
                NodeKind::File => {
                    let entry_name = format!("{}{}", prefix, path);
                    let mut reader = source.open(&path).map_err(|e| ArchiveError::StreamFailed {
                        entry: entry_name.clone(),
                        source: e,
                    })?;
                    self.add_stream(&mut reader, &entry_name)?;
                    added += 1;
                }
            }
        }

        Ok(added)
    }

    fn add_directory_marker(&mut self, name: &str) -> ArchiveResult<()> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{}/", name)
        };
        self.claim_name(&name)?;
        debug!(entry = %name, "Adding directory marker");
        self.writer
            .add_directory(name, self.options)
            .map_err(sink_error)?;
        Ok(())
    }

    fn start_entry(&mut self, entry_name: &str) -> ArchiveResult<()> {
        self.claim_name(entry_name)?;
        debug!(entry = %entry_name, "Adding archive entry");
        self.writer
            .start_file(entry_name, self.options)
            .map_err(sink_error)?;
        Ok(())
    }

    fn claim_name(&mut self, name: &str) -> ArchiveResult<()> {
        if !self.names.insert(name.to_string()) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        Ok(())
    }

    fn copy_into_entry(&mut self, source: &mut dyn Read) -> Result<u64, CopyError> {
        let mut buffer = [0u8; TRANSFER_CHUNK_SIZE];
        let mut total = 0u64;
        loop {
            let read = source.read(&mut buffer).map_err(CopyError::Read)?;
            if read == 0 {
                break;
            }
            self.writer
                .write_all(&buffer[..read])
                .map_err(CopyError::Write)?;
            total += read as u64;
        }
        Ok(total)
    }
}

/// I/O failures while writing are sink failures, not malformed data.
fn sink_error(err: ZipError) -> ArchiveError {
    match err {
        ZipError::Io(e) => ArchiveError::SinkFailed(e),
        other => ArchiveError::Malformed(other),
    }
}

/// Distinguishes source-side from archive-side failures during a copy.
enum CopyError {
    Read(std::io::Error),
    Write(std::io::Error),
}
