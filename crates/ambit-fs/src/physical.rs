//! File system trait and the disk-backed implementation

use crate::error::{FsError, FsResult};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Minimal file-system surface used by scopes
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Write `contents` to `path`
    ///
    /// # Errors
    /// `FsError::AlreadyExists` when the file exists and `overwrite` is false.
    fn add_file(&self, path: &Path, contents: &[u8], overwrite: bool) -> FsResult<()>;

    /// Read the whole file
    ///
    /// # Errors
    /// `FsError::NotFound` for a missing file.
    fn open_file(&self, path: &Path) -> FsResult<Vec<u8>>;

    /// Remove the file; missing files are ignored
    ///
    /// # Errors
    /// Path or I/O errors.
    fn delete_file(&self, path: &Path) -> FsResult<()>;

    /// Whether the file exists
    fn file_exists(&self, path: &Path) -> bool;

    /// Files directly inside `dir`, sorted
    ///
    /// # Errors
    /// Path or I/O errors.
    fn get_files(&self, dir: &Path) -> FsResult<Vec<PathBuf>>;
}

/// Normalize a relative path, rejecting anything that escapes the root
///
/// # Errors
/// `FsError::OutsideRoot` for absolute paths and `..` components.
pub fn normalize(path: &Path) -> FsResult<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(FsError::OutsideRoot {
                    path: path.to_path_buf(),
                });
            }
        }
    }
    Ok(normalized)
}

/// File system rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct PhysicalFileSystem {
    root: PathBuf,
}

impl PhysicalFileSystem {
    /// Create file system rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> FsResult<PathBuf> {
        Ok(self.root.join(normalize(path)?))
    }
}

impl FileSystem for PhysicalFileSystem {
    fn add_file(&self, path: &Path, contents: &[u8], overwrite: bool) -> FsResult<()> {
        let full = self.resolve(path)?;
        if !overwrite && full.is_file() {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::io(parent, e))?;
        }
        fs::write(&full, contents).map_err(|e| FsError::io(&full, e))
    }

    fn open_file(&self, path: &Path) -> FsResult<Vec<u8>> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => FsError::NotFound {
                path: path.to_path_buf(),
            },
            _ => FsError::io(&full, e),
        })
    }

    fn delete_file(&self, path: &Path) -> FsResult<()> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::io(&full, e)),
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.resolve(path).is_ok_and(|full| full.is_file())
    }

    fn get_files(&self, dir: &Path) -> FsResult<Vec<PathBuf>> {
        let relative = normalize(dir)?;
        let full = self.root.join(&relative);
        let entries = match fs::read_dir(&full) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FsError::io(&full, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::io(&full, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| FsError::io(entry.path(), e))?
                .is_file();
            if is_file {
                files.push(relative.join(entry.file_name()));
            }
        }
        files.sort();
        Ok(files)
    }
}
