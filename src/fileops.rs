//! String based filesystem helpers. Both `/` and `\` are treated as path
//! separators when taking paths apart.

use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{Result, UtilsError};

const PATH_SEPARATORS: &[char] = &['/', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileSystemEntryType {
    File,
    Directory,
    SymbolicLink,
    Unknown,
}

impl From<fs::FileType> for FileSystemEntryType {
    fn from(file_type: fs::FileType) -> Self {
        if file_type.is_file() {
            Self::File
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_symlink() {
            Self::SymbolicLink
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationType {
    Flat,
    Recursive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemEntry {
    path: String,
    entry_type: FileSystemEntryType,
}

impl FileSystemEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn entry_type(&self) -> FileSystemEntryType {
        self.entry_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemEntryInfo {
    pub entry_type: FileSystemEntryType,
    pub size_in_bytes: u64,
    pub modify_time: Option<SystemTime>,
    pub access_time: Option<SystemTime>,
    /// Not every platform records creation times
    pub create_time: Option<SystemTime>,
}

/// An open directory, iterated as the entries it contains.
///
/// Only files, directories and symbolic links are yielded, each with a
/// path built by [`combine_path`] from the directory path and the entry
/// name.
#[derive(Debug)]
pub struct Directory {
    path: String,
    entries: fs::ReadDir,
}

impl Directory {
    pub fn open(path: &str) -> Result<Self> {
        let entries = fs::read_dir(path)
            .map_err(UtilsError::fs("Failed to open directory", path))?;

        Ok(Self {
            path: path.to_owned(),
            entries,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn next_entry(&mut self) -> Option<Result<FileSystemEntry>> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(UtilsError::fs(
                        "Failed to read directory entry",
                        &self.path,
                    )(e)))
                }
            };

            let entry_type = match entry.file_type() {
                Ok(file_type) => FileSystemEntryType::from(file_type),
                Err(e) => {
                    return Some(Err(UtilsError::fs(
                        "Failed to obtain entry type",
                        entry.path(),
                    )(e)))
                }
            };

            if entry_type == FileSystemEntryType::Unknown {
                log::trace!("Skipping special file: {:?}", entry.path());
                continue;
            }

            let name = entry.file_name();
            return Some(
                combine_path(&self.path, &name.to_string_lossy())
                    .map(|path| FileSystemEntry { path, entry_type }),
            );
        }
    }
}

impl Iterator for Directory {
    type Item = Result<FileSystemEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry()
    }
}

pub fn read_text_file(path: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(UtilsError::fs("Failed to open file for reading", path))
}

pub fn read_file(path: &str) -> Result<Vec<u8>> {
    fs::read(path)
        .map_err(UtilsError::fs("Failed to open file for reading", path))
}

pub fn write_file(contents: &[u8], path: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(UtilsError::fs("Failed to open file for writing", path))
}

/// Extension of the file name part, without the dot
pub fn file_extension(path: &str) -> &str {
    let name = file_name(path);
    name.rfind('.')
        .map_or("", |pos| &name[pos + 1..])
}

pub fn file_name(path: &str) -> &str {
    path.rfind(PATH_SEPARATORS)
        .map_or(path, |pos| &path[pos + 1..])
}

pub fn file_name_without_extension(path: &str) -> &str {
    let name = file_name(path);
    name.rfind('.').map_or(name, |pos| &name[..pos])
}

pub fn file_size(path: &str) -> Result<u64> {
    let metadata = fs::metadata(path)
        .map_err(UtilsError::fs("Failed to obtain size for file", path))?;
    Ok(metadata.len())
}

/// Information about the entry itself; symbolic links are not followed.
pub fn file_info(path: &str) -> Result<FileSystemEntryInfo> {
    let metadata = fs::symlink_metadata(path)
        .map_err(UtilsError::fs("Failed to obtain file info for file", path))?;

    Ok(FileSystemEntryInfo {
        entry_type: metadata.file_type().into(),
        size_in_bytes: metadata.len(),
        modify_time: metadata.modified().ok(),
        access_time: metadata.accessed().ok(),
        create_time: metadata.created().ok(),
    })
}

pub fn is_relative_path(path: &str) -> bool {
    // drive letter, e.g. "C:\"
    if path.as_bytes().get(1) == Some(&b':') {
        return false;
    }
    !path.starts_with(PATH_SEPARATORS)
}

pub fn path_exists(path: &str) -> bool {
    Path::new(path).exists()
}

pub fn delete_file(path: &str) -> Result<()> {
    fs::remove_file(path)
        .map_err(UtilsError::fs("Failed to remove file", path))
}

pub fn create_directory(path: &str) -> Result<()> {
    fs::create_dir(path)
        .map_err(UtilsError::fs("Failed to create directory", path))
}

pub fn create_directory_if_not_exists(path: &str) -> Result<()> {
    if path_exists(path) {
        return Ok(());
    }
    create_directory(path)
}

/// Fails unless the directory is empty
pub fn delete_directory(path: &str) -> Result<()> {
    fs::remove_dir(path)
        .map_err(UtilsError::fs("Failed to delete directory", path))
}

pub fn delete_directory_recursive(path: &str) -> Result<()> {
    log::debug!("Deleting directory tree: {}", path);

    for entry in Directory::open(path)? {
        let entry = entry?;
        match entry.entry_type() {
            FileSystemEntryType::Directory => {
                delete_directory_recursive(entry.path())?
            }
            _ => delete_file(entry.path())?,
        }
    }

    delete_directory(path)
}

pub fn change_directory(path: &str) -> Result<()> {
    std::env::set_current_dir(path)
        .map_err(UtilsError::fs("Failed to change directory", path))
}

/// Directory part of a file path.
///
/// A path ending in a separator does not name a file and is rejected.
pub fn path_from_filepath(path: &str) -> Result<&str> {
    if path.ends_with(PATH_SEPARATORS) {
        return Err(UtilsError::Path(format!(
            "Path is not a filename: {}",
            path
        )));
    }

    Ok(match path.rfind(PATH_SEPARATORS) {
        None => "",
        Some(0) => &path[..1],
        Some(pos) => &path[..pos],
    })
}

pub fn combine_path(left: &str, right: &str) -> Result<String> {
    if left.is_empty() {
        return Err(UtilsError::Path(
            "Left part of combination is empty".to_owned(),
        ));
    }

    let mut path = String::with_capacity(left.len() + right.len() + 1);
    path.push_str(left);
    if !left.ends_with(PATH_SEPARATORS) {
        path.push(MAIN_SEPARATOR);
    }
    path.push_str(right);
    Ok(path)
}

fn walk(path: &str, iteration: IterationType) -> WalkDir {
    let walker = WalkDir::new(path).min_depth(1);
    match iteration {
        IterationType::Flat => walker.max_depth(1),
        IterationType::Recursive => walker,
    }
}

/// Number of files and symbolic links in a directory
pub fn count_files_in_directory(
    path: &str,
    iteration: IterationType,
) -> Result<u64> {
    let mut count = 0;
    for entry in walk(path, iteration) {
        let file_type = entry?.file_type();
        if file_type.is_file() || file_type.is_symlink() {
            count += 1;
        }
    }
    Ok(count)
}

/// Total size of the regular files in a directory
pub fn calculate_directory_size(
    path: &str,
    iteration: IterationType,
) -> Result<u64> {
    let mut size = 0;
    for entry in walk(path, iteration) {
        let entry = entry?;
        if entry.file_type().is_file() {
            size += entry.metadata()?.len();
        }
    }
    Ok(size)
}

pub fn home_directory() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        UtilsError::Path("Failed to get home directory".to_owned())
    })
}

pub fn config_directory() -> Result<PathBuf> {
    dirs::config_dir().ok_or_else(|| {
        UtilsError::Path("Failed to get config directory".to_owned())
    })
}

pub fn data_directory() -> Result<PathBuf> {
    dirs::data_dir().ok_or_else(|| {
        UtilsError::Path("Failed to get data directory".to_owned())
    })
}
