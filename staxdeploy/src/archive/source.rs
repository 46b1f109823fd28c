//! Directory sources walked by the archive builder.
//!
//! A `DirectorySource` exposes a tree through slash-separated paths relative
//! to its root (`""` is the root itself). `FsDirectory` reads a real
//! directory; `MemoryDirectory` holds the tree in memory.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Kind of a node in a directory source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// A direct child of a directory in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    /// File name of the child (single path component).
    pub name: String,
    pub kind: NodeKind,
}

impl SourceNode {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::File,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Directory,
        }
    }

    /// Hidden nodes are skipped by the archive builder.
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// A tree of files that can be added to an archive.
pub trait DirectorySource {
    /// List the direct children of `dir`, sorted by name.
    fn children(&self, dir: &str) -> io::Result<Vec<SourceNode>>;

    /// Open the file at `path` for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Join a relative directory path and a child name.
pub(crate) fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Directory source backed by the host filesystem.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl FsDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|c| !c.is_empty())
            .fold(self.root.clone(), |path, component| path.join(component))
    }
}

impl DirectorySource for FsDirectory {
    fn children(&self, dir: &str) -> io::Result<Vec<SourceNode>> {
        let walker = WalkDir::new(self.resolve(dir))
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        let mut nodes = Vec::new();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().is_dir() {
                nodes.push(SourceNode::dir(name));
            } else if entry.file_type().is_file() {
                nodes.push(SourceNode::file(name));
            }
        }
        Ok(nodes)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.resolve(path))?;
        Ok(Box::new(file))
    }
}

/// Directory source held entirely in memory.
///
/// Files are keyed by their slash-separated path; intermediate directories
/// are implied. Empty directories must be declared with `with_dir`.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file at `path` with the given content.
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Declare a (possibly empty) directory at `path`.
    pub fn with_dir(mut self, path: impl Into<String>) -> Self {
        self.dirs.insert(path.into().trim_end_matches('/').to_string());
        self
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.dirs.contains(path)
            || self.dirs.iter().any(|d| d.starts_with(&prefix))
            || self.files.keys().any(|f| f.starts_with(&prefix))
    }
}

impl DirectorySource for MemoryDirectory {
    fn children(&self, dir: &str) -> io::Result<Vec<SourceNode>> {
        if !dir.is_empty() && !self.is_dir(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir),
            ));
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut names = BTreeSet::new();
        for path in self.files.keys().chain(self.dirs.iter()) {
            if let Some(rest) = path.strip_prefix(&prefix) {
                if let Some(first) = rest.split('/').next().filter(|s| !s.is_empty()) {
                    names.insert(first.to_string());
                }
            }
        }

        Ok(names
            .into_iter()
            .map(|name| {
                let full = join_relative(dir, &name);
                if self.files.contains_key(&full) {
                    SourceNode::file(name)
                } else {
                    SourceNode::dir(name)
                }
            })
            .collect())
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read + '_>> {
        self.files
            .get(path)
            .map(|content| Box::new(Cursor::new(content.as_slice())) as Box<dyn Read + '_>)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path)))
    }
}
