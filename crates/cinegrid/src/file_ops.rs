//! File name checks and file renaming.

use std::io;
use std::path::{Path, PathBuf};

use cinegrid_core::logging::targets;
use thiserror::Error;

/// Characters never allowed in a file name.
pub const ILLEGAL_FILE_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', ','];

#[cfg(windows)]
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1", "LPT2",
    "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Why a file name was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileNameError {
    #[error("file name is empty")]
    Empty,

    #[error("file name is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("file name contains the illegal character {0:?}")]
    IllegalChar(char),

    #[error("{0} is a reserved device name")]
    Reserved(String),
}

/// Check that `name` can be used as a file name.
///
/// `name` is a bare file name, extension included, without any directory.
pub fn filename_validate(name: &str, max_len: usize) -> Result<(), FileNameError> {
    if name.trim().is_empty() {
        return Err(FileNameError::Empty);
    }
    let len = name.chars().count();
    if len > max_len {
        return Err(FileNameError::TooLong { len, max: max_len });
    }
    if let Some(c) = name.chars().find(|c| ILLEGAL_FILE_NAME_CHARS.contains(c)) {
        return Err(FileNameError::IllegalChar(c));
    }
    #[cfg(windows)]
    if RESERVED_NAMES.iter().any(|reserved| reserved.eq_ignore_ascii_case(name)) {
        return Err(FileNameError::Reserved(name.to_string()));
    }
    Ok(())
}

/// Split a path into its directory, file stem and extension.
///
/// The extension keeps its leading dot and is empty when there is none.
pub fn split_file_path(path: &Path) -> (PathBuf, String, String) {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (dir, stem, ext)
}

/// Join a directory, file stem and extension. A missing dot is added to the
/// extension.
pub fn file_join(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let mut name = stem.to_string();
    if !ext.is_empty() {
        if !ext.starts_with('.') {
            name.push('.');
        }
        name.push_str(ext);
    }
    dir.join(name)
}

/// The file system operations dialogs perform.
pub trait FileOps: Send + Sync {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// [`FileOps`] on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileOps;

impl FileOps for LocalFileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if from == to {
            return Ok(());
        }
        if !from.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", from.display()),
            ));
        }
        let target_dir = to.parent().filter(|dir| !dir.as_os_str().is_empty());
        if target_dir.is_some_and(|dir| !dir.is_dir()) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("folder of {} does not exist", to.display()),
            ));
        }
        if to.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            ));
        }
        std::fs::rename(from, to)?;
        tracing::debug!(target: targets::FILES, from = %from.display(), to = %to.display(), "renamed file");
        Ok(())
    }
}
