//! Streaming `multipart/form-data` encoder.
//!
//! The form is written straight into any `io::Write`; file parts are copied
//! from disk in fixed-size chunks and never buffered whole. The encoded
//! length is known up front so the request can carry a `Content-Length`.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::archive::{ArchiveError, TRANSFER_CHUNK_SIZE};

const CRLF: &str = "\r\n";

#[derive(Debug, Clone)]
enum Part {
    File {
        name: String,
        filename: String,
        path: PathBuf,
        len: u64,
    },
    Text {
        name: String,
        value: String,
    },
}

impl Part {
    fn name(&self) -> &str {
        match self {
            Part::File { name, .. } | Part::Text { name, .. } => name,
        }
    }

    fn header(&self, boundary: &str) -> String {
        match self {
            Part::File { name, filename, .. } => format!(
                "--{boundary}{CRLF}\
                 Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"{CRLF}\
                 Content-Type: application/octet-stream{CRLF}{CRLF}",
                quote(name),
                quote(filename),
            ),
            Part::Text { name, .. } => format!(
                "--{boundary}{CRLF}\
                 Content-Disposition: form-data; name=\"{}\"{CRLF}\
                 Content-Type: text/plain; charset=UTF-8{CRLF}{CRLF}",
                quote(name),
            ),
        }
    }

    fn body_len(&self) -> u64 {
        match self {
            Part::File { len, .. } => *len,
            Part::Text { value, .. } => value.len() as u64,
        }
    }
}

fn quote(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn generate_boundary() -> String {
    let mut rng = rand::rng();
    format!(
        "staxdeploy-{:016x}{:016x}",
        rng.random::<u64>(),
        rng.random::<u64>()
    )
}

/// An ordered list of form parts.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Create an empty form with a fresh boundary.
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Create an empty form with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a file part. The file's size is taken now.
    pub fn add_file(&mut self, name: &str, path: &Path) -> Result<&mut Self, ArchiveError> {
        let len = std::fs::metadata(path)
            .map_err(|e| ArchiveError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());

        self.parts.push(Part::File {
            name: name.to_string(),
            filename,
            path: path.to_path_buf(),
            len,
        });
        Ok(self)
    }

    /// Append a text part.
    pub fn add_text(&mut self, name: &str, value: &str) -> &mut Self {
        self.parts.push(Part::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Part names in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(Part::name).collect()
    }

    /// Total size of the file parts' contents.
    pub fn file_bytes(&self) -> u64 {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::File { len, .. } => Some(*len),
                Part::Text { .. } => None,
            })
            .sum()
    }

    fn closing(&self) -> String {
        format!("--{}--{CRLF}", self.boundary)
    }

    /// Exact number of bytes [`write_to`](Self::write_to) produces.
    pub fn content_length(&self) -> u64 {
        let parts: u64 = self
            .parts
            .iter()
            .map(|p| p.header(&self.boundary).len() as u64 + p.body_len() + CRLF.len() as u64)
            .sum();
        parts + self.closing().len() as u64
    }

    /// Encode the form into `out`.
    ///
    /// Fails if a file part can no longer be read or no longer has the size
    /// recorded when it was added.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        for part in &self.parts {
            out.write_all(part.header(&self.boundary).as_bytes())?;
            match part {
                Part::File { path, len, .. } => copy_file(path, *len, out)?,
                Part::Text { value, .. } => out.write_all(value.as_bytes())?,
            }
            out.write_all(CRLF.as_bytes())?;
        }
        out.write_all(self.closing().as_bytes())?;
        out.flush()
    }
}

fn copy_file<W: Write + ?Sized>(path: &Path, len: u64, out: &mut W) -> io::Result<()> {
    let mut file = File::open(path)?.take(len);
    let mut buffer = vec![0u8; TRANSFER_CHUNK_SIZE];
    let mut copied = 0u64;

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n])?;
        copied += n as u64;
    }

    if copied != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "{} shrank during upload ({} of {} bytes)",
                path.display(),
                copied,
                len
            ),
        ));
    }
    Ok(())
}
