//! File helpers shared by the pipeline steps

use crate::checksum::{checksum, file_checksum};
use crate::error::{Result, UsageError};
use crate::types::{FileFormat, FileMeta};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A regular file found in a folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Fail with `InvalidFolder` unless `folder` exists and is a directory
pub fn ensure_folder(folder: impl AsRef<Path>) -> Result<()> {
    let folder = folder.as_ref();
    match std::fs::metadata(folder) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(UsageError::InvalidFolder(folder.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(UsageError::InvalidFolder(folder.to_path_buf()))
        },
        Err(e) => Err(UsageError::from_io(e, folder)),
    }
}

/// List the regular files directly inside `folder`, skipping sub-folders
pub fn list_files_in_folder(folder: impl AsRef<Path>) -> Result<Vec<FolderEntry>> {
    let folder = folder.as_ref();
    ensure_folder(folder)?;

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(|e| UsageError::from_io(e, folder))? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            continue;
        }
        entries.push(FolderEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
            modified: meta.modified()?,
        });
    }

    Ok(entries)
}

/// Compare two readable sources by checksum
pub fn compare_files<A: Read, B: Read>(a: &mut A, b: &mut B) -> Result<bool> {
    Ok(checksum(a)? == checksum(b)?)
}

/// Compare two files on disk by checksum
pub fn compare_files_by_name(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool> {
    Ok(file_checksum(a)? == file_checksum(b)?)
}

/// Write `reader` into a new file inside `folder`, named by `format`
///
/// Returns the metadata of the written file, checksum included.
pub fn create_from_reader<R: Read>(
    reader: &mut R,
    folder: impl AsRef<Path>,
    format: &FileFormat,
) -> Result<FileMeta> {
    let folder = folder.as_ref();
    ensure_folder(folder)?;

    let file_name = format.new_file_name();
    let full_path = folder.join(&file_name);

    let mut file = std::fs::File::create(&full_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => UsageError::Permission(folder.to_path_buf()),
        _ => UsageError::Io(e),
    })?;
    std::io::copy(reader, &mut file)?;
    file.sync_all()?;
    drop(file);

    let checksum = file_checksum(&full_path)?;
    tracing::debug!(file = %full_path.display(), %checksum, "Created file from reader");

    Ok(FileMeta::new(file_name, folder, checksum))
}
