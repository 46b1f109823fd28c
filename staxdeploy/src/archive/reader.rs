//! Sequential archive reading and extraction.
//!
//! Archives are decoded as a stream of local entries, so any `Read` source
//! works (no seeking required). The `*_in_file` / `*_from_file` variants read
//! the central directory instead and also handle data-descriptor entries.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use super::builder::TRANSFER_CHUNK_SIZE;
use super::error::{ArchiveError, ArchiveResult};
use super::{EntryInfo, EntryKind};

/// Invoke `handler` once per entry, in archive order.
///
/// The content reader passed to the handler borrows the decoder and is only
/// valid for the duration of the call; handlers that need the bytes later
/// must copy them. An error returned by the handler stops iteration.
///
/// # Returns
///
/// The number of entries visited.
pub fn for_each_entry<R, F>(source: R, mut handler: F) -> ArchiveResult<usize>
where
    R: Read,
    F: FnMut(&EntryInfo, &mut dyn Read) -> ArchiveResult<()>,
{
    let mut reader = BufReader::new(source);
    let mut count = 0;

    while let Some(mut file) = zip::read::read_zipfile_from_stream(&mut reader)? {
        let info = entry_info(file.name(), file.is_dir(), file.size());
        handler(&info, &mut file)?;
        count += 1;
    }

    Ok(count)
}

/// Invoke `handler` once per entry of the archive file at `path`.
///
/// Unlike [`for_each_entry`] this reads the central directory, so entries
/// whose sizes are only recorded in trailing data descriptors (as written by
/// the `jar` tool) are supported. Entries are visited in central directory
/// order.
pub fn for_each_entry_in_file<F>(path: &Path, mut handler: F) -> ArchiveResult<usize>
where
    F: FnMut(&EntryInfo, &mut dyn Read) -> ArchiveResult<()>,
{
    let file = File::open(path).map_err(|e| ArchiveError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let info = entry_info(entry.name(), entry.is_dir(), entry.size());
        handler(&info, &mut entry)?;
    }

    Ok(archive.len())
}

fn entry_info(name: &str, is_dir: bool, size: u64) -> EntryInfo {
    EntryInfo {
        name: name.to_string(),
        kind: if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        size,
    }
}

/// List the metadata of every entry, in archive order.
pub fn list_entries<R: Read>(source: R) -> ArchiveResult<Vec<EntryInfo>> {
    let mut entries = Vec::new();
    for_each_entry(source, |info, _| {
        entries.push(info.clone());
        Ok(())
    })?;
    Ok(entries)
}

/// List the metadata of every entry of the archive file at `path`.
///
/// Reads the central directory, so jar-style archives with data descriptors
/// are supported.
pub fn list_entries_in_file(path: &Path) -> ArchiveResult<Vec<EntryInfo>> {
    let mut entries = Vec::new();
    for_each_entry_in_file(path, |info, _| {
        entries.push(info.clone());
        Ok(())
    })?;
    Ok(entries)
}

/// Buffer the content of the first entry named `entry_name` into memory.
///
/// Returns `None` when no entry has that name.
pub fn extract_entry<R: Read>(source: R, entry_name: &str) -> ArchiveResult<Option<Vec<u8>>> {
    let mut found: Option<Vec<u8>> = None;
    for_each_entry(source, |info, content| {
        if found.is_none() && info.name == entry_name {
            // Header sizes are untrusted; cap the preallocation.
            let hint = info.size.min(TRANSFER_CHUNK_SIZE as u64) as usize;
            let mut bytes = Vec::with_capacity(hint);
            content
                .read_to_end(&mut bytes)
                .map_err(|e| ArchiveError::StreamFailed {
                    entry: info.name.clone(),
                    source: e,
                })?;
            found = Some(bytes);
        }
        Ok(())
    })?;
    Ok(found)
}

/// Materialize every entry as a file under `target_dir`.
///
/// Parent directories are created as needed and directory markers become
/// empty directories. Entries already written are left in place if a later
/// entry fails.
///
/// # Returns
///
/// The number of entries extracted.
pub fn extract_all<R: Read>(source: R, target_dir: &Path) -> ArchiveResult<usize> {
    create_target(target_dir)?;
    for_each_entry(source, |info, content| extract_one(target_dir, info, content))
}

/// Like [`extract_all`], reading the archive file at `path` through its
/// central directory.
pub fn extract_all_from_file(path: &Path, target_dir: &Path) -> ArchiveResult<usize> {
    create_target(target_dir)?;
    for_each_entry_in_file(path, |info, content| extract_one(target_dir, info, content))
}

fn create_target(target_dir: &Path) -> ArchiveResult<()> {
    fs::create_dir_all(target_dir).map_err(|e| ArchiveError::CreateDirFailed {
        path: target_dir.to_path_buf(),
        source: e,
    })
}

fn extract_one(target_dir: &Path, info: &EntryInfo, content: &mut dyn Read) -> ArchiveResult<()> {
    let dest = entry_destination(target_dir, &info.name)?;

    if info.is_dir() {
        debug!(entry = %info.name, "Creating directory");
        return fs::create_dir_all(&dest).map_err(|e| ArchiveError::CreateDirFailed {
            path: dest,
            source: e,
        });
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ArchiveError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    debug!(entry = %info.name, size = info.size, "Extracting entry");
    write_entry(content, &dest)
}

fn write_entry(content: &mut dyn Read, dest: &Path) -> ArchiveResult<()> {
    let write_failed = |e: io::Error| ArchiveError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    };

    let file = File::create(dest).map_err(write_failed)?;
    let mut writer = BufWriter::new(file);
    io::copy(content, &mut writer).map_err(write_failed)?;
    writer.flush().map_err(write_failed)
}

/// Map an entry name onto a path below `target_dir`.
///
/// Rejects absolute names and names with `..` components.
fn entry_destination(target_dir: &Path, name: &str) -> ArchiveResult<PathBuf> {
    let relative = Path::new(name.trim_end_matches('/'));
    let mut dest = target_dir.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => dest.push(part),
            Component::CurDir => {}
            _ => return Err(ArchiveError::UnsafeEntryName(name.to_string())),
        }
    }

    if dest == target_dir {
        return Err(ArchiveError::UnsafeEntryName(name.to_string()));
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveBuilder;
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn build(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ArchiveBuilder::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            builder.add_stream(*content, name).unwrap();
        }
        builder.finish().unwrap().into_inner()
    }

    #[test]
    fn test_round_trip_contents() {
        let archive = build(&[("B", &b"bytes of b"[..]), ("A", &b"\x00\x01\x02binary"[..])]);

        let mut read = BTreeMap::new();
        for_each_entry(Cursor::new(archive), |info, content| {
            let mut bytes = Vec::new();
            content.read_to_end(&mut bytes).unwrap();
            read.insert(info.name.clone(), bytes);
            Ok(())
        })
        .unwrap();

        let expected: BTreeMap<String, Vec<u8>> = [
            ("A".to_string(), b"\x00\x01\x02binary".to_vec()),
            ("B".to_string(), b"bytes of b".to_vec()),
        ]
        .into_iter()
        .collect();
        assert_eq!(read, expected);
    }

    #[test]
    fn test_for_each_entry_preserves_order() {
        let archive = build(&[("z.txt", &b"z"[..]), ("a.txt", &b"a"[..]), ("m.txt", &b"m"[..])]);
        let names: Vec<String> = list_entries(Cursor::new(archive))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["z.txt", "a.txt", "m.txt"]);
    }

    #[test]
    fn test_handler_error_stops_iteration() {
        let archive = build(&[("a", &b"1"[..]), ("b", &b"2"[..])]);
        let mut visited = 0;
        let result = for_each_entry(Cursor::new(archive), |info, _| {
            visited += 1;
            Err(ArchiveError::DuplicateEntry(info.name.clone()))
        });
        assert!(result.is_err());
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_extract_entry() {
        let archive = build(&[
            ("webapp.war", &b"war"[..]),
            ("META-INF/stax-application.xml", &b"<stax-application/>"[..]),
        ]);

        let found = extract_entry(Cursor::new(archive.clone()), "META-INF/stax-application.xml")
            .unwrap();
        assert_eq!(found.as_deref(), Some(&b"<stax-application/>"[..]));

        let missing = extract_entry(Cursor::new(archive), "WEB-INF/stax-web.xml").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_extract_all_creates_files_and_dirs() {
        let mut builder = ArchiveBuilder::new(Cursor::new(Vec::new()));
        builder.add_stream(&b"<html/>"[..], "site/index.html").unwrap();
        let source = crate::archive::MemoryDirectory::new().with_dir("logs");
        builder.add_directory_from(&source, "site/").unwrap();
        let archive = builder.finish().unwrap().into_inner();

        let temp = TempDir::new().unwrap();
        let count = extract_all(Cursor::new(archive), temp.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(temp.path().join("site/index.html")).unwrap(),
            "<html/>"
        );
        assert!(temp.path().join("site/logs").is_dir());
    }

    #[test]
    fn test_for_each_entry_in_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("deploy.zip");
        fs::write(&path, build(&[("webapp.war", &b"war"[..]), ("notes.txt", &b"hi"[..])])).unwrap();

        let mut seen = Vec::new();
        let count = for_each_entry_in_file(&path, |info, content| {
            let mut text = String::new();
            content.read_to_string(&mut text).unwrap();
            seen.push((info.name.clone(), text));
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            seen,
            vec![
                ("webapp.war".to_string(), "war".to_string()),
                ("notes.txt".to_string(), "hi".to_string()),
            ]
        );

        let missing = for_each_entry_in_file(&temp.path().join("missing.zip"), |_, _| Ok(()));
        assert!(matches!(missing, Err(ArchiveError::ReadFailed { .. })));
    }

    #[test]
    fn test_malformed_archive() {
        let result = list_entries(Cursor::new(b"this is not a zip archive".to_vec()));
        assert!(matches!(result, Err(ArchiveError::Malformed(_))));
    }

    #[test]
    fn test_entry_destination_rejects_escape() {
        let target = Path::new("/tmp/target");
        assert!(entry_destination(target, "../etc/passwd").is_err());
        assert!(entry_destination(target, "/etc/passwd").is_err());
        assert_eq!(
            entry_destination(target, "a/b.txt").unwrap(),
            PathBuf::from("/tmp/target/a/b.txt")
        );
        assert_eq!(
            entry_destination(target, "logs/").unwrap(),
            PathBuf::from("/tmp/target/logs")
        );
    }

    /// A single stored entry whose sizes live in a trailing data
    /// descriptor, as `jar` and streaming zippers write it.
    fn data_descriptor_zip(name: &str, content: &[u8], crc: u32) -> Vec<u8> {
        let size = content.len() as u32;
        let name_len = name.len() as u16;
        let mut out = Vec::new();

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0x0008u16.to_le_bytes()); // flags: data descriptor
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&[0u8; 4]); // time, date
        out.extend_from_slice(&[0u8; 12]); // crc, sizes deferred
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(content);

        out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());

        let central_offset = out.len() as u32;
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version made by
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0x0008u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]); // extra, comment, disk, internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        out.extend_from_slice(name.as_bytes());
        let central_size = out.len() as u32 - central_offset;

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // disk numbers
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&central_size.to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    const HELLO_CRC: u32 = 0x3610_a686;

    #[test]
    fn test_list_file_with_data_descriptor() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.war");
        fs::write(&path, data_descriptor_zip("WEB-INF/web.xml", b"hello", HELLO_CRC)).unwrap();

        let entries = list_entries_in_file(&path).unwrap();
        assert_eq!(
            entries,
            vec![EntryInfo {
                name: "WEB-INF/web.xml".to_string(),
                kind: EntryKind::File,
                size: 5,
            }]
        );
    }

    #[test]
    fn test_extract_file_with_data_descriptor() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("app.war");
        fs::write(&path, data_descriptor_zip("WEB-INF/web.xml", b"hello", HELLO_CRC)).unwrap();

        let target = temp.path().join("out");
        assert_eq!(extract_all_from_file(&path, &target).unwrap(), 1);
        assert_eq!(
            fs::read_to_string(target.join("WEB-INF/web.xml")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_huge_declared_size_is_not_preallocated() {
        let name = b"META-INF/stax-application.xml";
        let content = b"hello";
        let mut zip = Vec::new();
        zip.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        zip.extend_from_slice(&45u16.to_le_bytes()); // zip64
        zip.extend_from_slice(&0u16.to_le_bytes());
        zip.extend_from_slice(&0u16.to_le_bytes()); // stored
        zip.extend_from_slice(&[0u8; 4]);
        zip.extend_from_slice(&HELLO_CRC.to_le_bytes());
        zip.extend_from_slice(&u32::MAX.to_le_bytes());
        zip.extend_from_slice(&u32::MAX.to_le_bytes());
        zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
        zip.extend_from_slice(&20u16.to_le_bytes());
        zip.extend_from_slice(name);
        zip.extend_from_slice(&0x0001u16.to_le_bytes()); // zip64 extra field
        zip.extend_from_slice(&16u16.to_le_bytes());
        zip.extend_from_slice(&0x7FFF_FFFF_FFFF_FFF0u64.to_le_bytes()); // uncompressed
        zip.extend_from_slice(&(content.len() as u64).to_le_bytes()); // compressed
        zip.extend_from_slice(content);

        // Must come back as a value, not abort on allocation.
        match extract_entry(Cursor::new(zip), "META-INF/stax-application.xml") {
            Err(_) => {}
            Ok(found) => assert!(found.map_or(true, |bytes| bytes.len() <= content.len())),
        }
    }
}
