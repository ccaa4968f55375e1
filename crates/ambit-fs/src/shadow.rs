//! Shadowed file systems
//!
//! While a [`ShadowSession`] is open every operation routed through
//! [`FileSystems`] hits an in-memory overlay instead of the inner file
//! system. Disposing a completed session replays the overlay in write order;
//! anything else throws it away.
//!
//! ```text
//! FileSystems ──(no shadow)──────────────▶ inner
//!      │
//!      └──(shadow)──▶ overlay ──commit──▶ inner
//! ```

use crate::error::{FsError, FsResult};
use crate::physical::{normalize, FileSystem};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Something that is completed, then disposed
pub trait Completable {
    /// Error raised on disposal
    type Error;

    /// Mark for commit
    fn complete(&mut self);

    /// Whether [`Completable::complete`] was called
    fn is_completed(&self) -> bool;

    /// End the session, committing if completed
    ///
    /// Committing is best effort, not atomic. See the implementor for what
    /// is left behind when it fails.
    ///
    /// # Errors
    /// Implementation specific.
    fn dispose(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone)]
enum ShadowEntry {
    Written(Vec<u8>),
    Deleted,
}

#[derive(Debug, Default)]
struct Overlay {
    entries: Mutex<IndexMap<PathBuf, ShadowEntry>>,
}

struct Shared {
    inner: Arc<dyn FileSystem>,
    active: Mutex<Option<Arc<Overlay>>>,
}

impl Shared {
    fn overlay(&self) -> Option<Arc<Overlay>> {
        self.active.lock().clone()
    }
}

/// File systems a scope can shadow
#[derive(Clone)]
pub struct FileSystems {
    shared: Arc<Shared>,
}

impl FileSystems {
    /// Wrap an inner file system
    #[must_use]
    pub fn new(inner: Arc<dyn FileSystem>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner,
                active: Mutex::new(None),
            }),
        }
    }

    /// Start buffering every operation
    ///
    /// # Errors
    /// `FsError::AlreadyShadowing` while another session is open.
    pub fn shadow(&self) -> FsResult<ShadowSession> {
        let mut active = self.shared.active.lock();
        if active.is_some() {
            return Err(FsError::AlreadyShadowing);
        }
        let overlay = Arc::new(Overlay::default());
        *active = Some(Arc::clone(&overlay));
        tracing::debug!("file systems shadowed");

        Ok(ShadowSession {
            shared: Arc::clone(&self.shared),
            overlay,
            completed: false,
            disposed: false,
        })
    }

    /// Whether a session is open
    #[must_use]
    pub fn is_shadowing(&self) -> bool {
        self.shared.active.lock().is_some()
    }

    /// File system behind the shadow
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn FileSystem> {
        &self.shared.inner
    }
}

impl fmt::Debug for FileSystems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystems")
            .field("inner", &self.shared.inner)
            .field("shadowing", &self.is_shadowing())
            .finish()
    }
}

impl FileSystem for FileSystems {
    fn add_file(&self, path: &Path, contents: &[u8], overwrite: bool) -> FsResult<()> {
        let Some(overlay) = self.shared.overlay() else {
            return self.shared.inner.add_file(path, contents, overwrite);
        };
        let key = normalize(path)?;
        if !overwrite && self.file_exists(&key) {
            return Err(FsError::AlreadyExists { path: key });
        }
        overlay
            .entries
            .lock()
            .insert(key, ShadowEntry::Written(contents.to_vec()));
        Ok(())
    }

    fn open_file(&self, path: &Path) -> FsResult<Vec<u8>> {
        let Some(overlay) = self.shared.overlay() else {
            return self.shared.inner.open_file(path);
        };
        let key = normalize(path)?;
        let entry = overlay.entries.lock().get(&key).cloned();
        match entry {
            Some(ShadowEntry::Written(contents)) => Ok(contents),
            Some(ShadowEntry::Deleted) => Err(FsError::NotFound { path: key }),
            None => self.shared.inner.open_file(&key),
        }
    }

    fn delete_file(&self, path: &Path) -> FsResult<()> {
        let Some(overlay) = self.shared.overlay() else {
            return self.shared.inner.delete_file(path);
        };
        let key = normalize(path)?;
        overlay.entries.lock().insert(key, ShadowEntry::Deleted);
        Ok(())
    }

    fn file_exists(&self, path: &Path) -> bool {
        let Some(overlay) = self.shared.overlay() else {
            return self.shared.inner.file_exists(path);
        };
        let Ok(key) = normalize(path) else {
            return false;
        };
        let entry = overlay.entries.lock().get(&key).cloned();
        match entry {
            Some(ShadowEntry::Written(_)) => true,
            Some(ShadowEntry::Deleted) => false,
            None => self.shared.inner.file_exists(&key),
        }
    }

    fn get_files(&self, dir: &Path) -> FsResult<Vec<PathBuf>> {
        let Some(overlay) = self.shared.overlay() else {
            return self.shared.inner.get_files(dir);
        };
        let dir = normalize(dir)?;
        let mut files: BTreeSet<PathBuf> = self.shared.inner.get_files(&dir)?.into_iter().collect();
        for (path, entry) in overlay.entries.lock().iter() {
            if path.parent() != Some(dir.as_path()) {
                continue;
            }
            match entry {
                ShadowEntry::Written(_) => files.insert(path.clone()),
                ShadowEntry::Deleted => files.remove(path),
            };
        }
        Ok(files.into_iter().collect())
    }
}

/// An open shadow over [`FileSystems`]
///
/// Dropping the session without disposing it discards the overlay.
///
/// A completed session replays its operations one by one when disposed. The
/// replay stops at the first I/O error, which is returned. Operations
/// replayed before it stay on the inner file system. The failing one and
/// everything after it are dropped.
pub struct ShadowSession {
    shared: Arc<Shared>,
    overlay: Arc<Overlay>,
    completed: bool,
    disposed: bool,
}

impl ShadowSession {
    /// Buffered operations not yet committed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.overlay.entries.lock().len()
    }

    fn detach(&self) {
        let mut active = self.shared.active.lock();
        if active
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &self.overlay))
        {
            *active = None;
        }
    }

    fn commit(&self) -> FsResult<()> {
        let entries = std::mem::take(&mut *self.overlay.entries.lock());
        tracing::debug!(operations = entries.len(), "committing shadowed file systems");
        for (path, entry) in entries {
            match entry {
                ShadowEntry::Written(contents) => self.shared.inner.add_file(&path, &contents, true)?,
                ShadowEntry::Deleted => self.shared.inner.delete_file(&path)?,
            }
        }
        Ok(())
    }
}

impl Completable for ShadowSession {
    type Error = FsError;

    fn complete(&mut self) {
        self.completed = true;
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn dispose(&mut self) -> FsResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.detach();

        if self.completed {
            self.commit()
        } else {
            let discarded = std::mem::take(&mut *self.overlay.entries.lock()).len();
            tracing::debug!(discarded, "discarding shadowed file systems");
            Ok(())
        }
    }
}

impl fmt::Debug for ShadowSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowSession")
            .field("pending", &self.pending())
            .field("completed", &self.completed)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Drop for ShadowSession {
    fn drop(&mut self) {
        if !self.disposed {
            self.completed = false;
            let _ = self.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::PhysicalFileSystem;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileSystems) {
        let dir = tempfile::tempdir().unwrap();
        let fs = FileSystems::new(Arc::new(PhysicalFileSystem::new(dir.path())));
        (dir, fs)
    }

    #[test]
    fn writes_pass_through_without_shadow() {
        let (dir, fs) = setup();
        fs.add_file(Path::new("a.txt"), b"x", false).unwrap();
        assert!(dir.path().join("a.txt").is_file());
    }

    #[test]
    fn shadowed_writes_are_buffered_until_commit() {
        let (dir, fs) = setup();
        let mut session = fs.shadow().unwrap();

        fs.add_file(Path::new("media/a.txt"), b"x", false).unwrap();
        assert!(fs.file_exists(Path::new("media/a.txt")));
        assert_eq!(fs.open_file(Path::new("media/a.txt")).unwrap(), b"x");
        assert!(!dir.path().join("media/a.txt").exists());

        session.complete();
        session.dispose().unwrap();

        assert!(!fs.is_shadowing());
        assert_eq!(std::fs::read(dir.path().join("media/a.txt")).unwrap(), b"x");
    }

    #[test]
    fn uncompleted_session_discards() {
        let (dir, fs) = setup();
        let mut session = fs.shadow().unwrap();
        fs.add_file(Path::new("a.txt"), b"x", false).unwrap();

        session.dispose().unwrap();

        assert!(!dir.path().join("a.txt").exists());
        assert!(!fs.file_exists(Path::new("a.txt")));
    }

    #[test]
    fn dropped_session_discards_even_if_completed() {
        let (dir, fs) = setup();
        {
            let mut session = fs.shadow().unwrap();
            fs.add_file(Path::new("a.txt"), b"x", false).unwrap();
            session.complete();
        }
        assert!(!fs.is_shadowing());
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn deletes_are_shadowed() {
        let (dir, fs) = setup();
        fs.add_file(Path::new("a.txt"), b"x", false).unwrap();

        let mut session = fs.shadow().unwrap();
        fs.delete_file(Path::new("a.txt")).unwrap();
        assert!(!fs.file_exists(Path::new("a.txt")));
        assert!(fs.open_file(Path::new("a.txt")).unwrap_err().is_not_found());
        assert!(dir.path().join("a.txt").exists());

        session.complete();
        session.dispose().unwrap();
        assert!(!dir.path().join("a.txt").exists());
    }

    #[test]
    fn listing_merges_overlay() {
        let (_dir, fs) = setup();
        fs.add_file(Path::new("css/a.css"), b"", false).unwrap();
        fs.add_file(Path::new("css/b.css"), b"", false).unwrap();

        let _session = fs.shadow().unwrap();
        fs.delete_file(Path::new("css/a.css")).unwrap();
        fs.add_file(Path::new("css/c.css"), b"", false).unwrap();
        fs.add_file(Path::new("js/d.js"), b"", false).unwrap();

        assert_eq!(
            fs.get_files(Path::new("css")).unwrap(),
            vec![PathBuf::from("css/b.css"), PathBuf::from("css/c.css")]
        );
    }

    #[test]
    fn one_session_at_a_time() {
        let (_dir, fs) = setup();
        let mut session = fs.shadow().unwrap();
        assert!(matches!(fs.shadow(), Err(FsError::AlreadyShadowing)));

        session.dispose().unwrap();
        assert!(fs.shadow().is_ok());
    }

    #[test]
    fn last_write_wins_on_commit() {
        let (dir, fs) = setup();
        let mut session = fs.shadow().unwrap();
        fs.add_file(Path::new("a.txt"), b"one", false).unwrap();
        fs.add_file(Path::new("a.txt"), b"two", true).unwrap();
        assert_eq!(session.pending(), 1);

        session.complete();
        session.dispose().unwrap();
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"two");
    }

    #[test]
    fn failed_commit_keeps_earlier_operations() {
        let (dir, fs) = setup();
        fs.add_file(Path::new("blocker"), b"", false).unwrap();

        let mut session = fs.shadow().unwrap();
        fs.add_file(Path::new("first.txt"), b"1", false).unwrap();
        fs.add_file(Path::new("blocker/inner.txt"), b"2", false).unwrap();
        fs.add_file(Path::new("last.txt"), b"3", false).unwrap();

        session.complete();
        let err = session.dispose().unwrap_err();

        assert!(matches!(err, FsError::Io { .. }));
        assert!(!fs.is_shadowing());
        assert_eq!(session.pending(), 0);
        assert_eq!(std::fs::read(dir.path().join("first.txt")).unwrap(), b"1");
        assert!(!dir.path().join("last.txt").exists());
    }
}
