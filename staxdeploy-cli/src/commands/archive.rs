//! `extract` and `list` commands.

use std::path::Path;

use staxdeploy::archive::{
    extract_all_from_file, list_entries_in_file, ArchiveError, EntryInfo,
};

use crate::error::CliError;

fn archive_error(path: &Path, err: ArchiveError) -> CliError {
    match err {
        ArchiveError::ReadFailed { source, .. } => CliError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => CliError::Archive(other),
    }
}

/// Extract every entry of `archive` below `target`.
pub fn run_extract(archive: &Path, target: &Path) -> Result<(), CliError> {
    let count = extract_all_from_file(archive, target).map_err(|e| archive_error(archive, e))?;
    println!("Extracted {} entries to {}", count, target.display());
    Ok(())
}

fn format_entry(entry: &EntryInfo) -> String {
    if entry.is_dir() {
        format!("{:>12}  {}", "-", entry.name)
    } else {
        format!("{:>12}  {}", entry.size, entry.name)
    }
}

/// Print the entries of `archive` in archive order.
pub fn run_list(archive: &Path) -> Result<(), CliError> {
    let entries = list_entries_in_file(archive).map_err(|e| archive_error(archive, e))?;
    for entry in &entries {
        println!("{}", format_entry(entry));
    }
    println!("{} entries", entries.len());
    Ok(())
}
