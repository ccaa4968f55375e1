//! Ambit FS
//!
//! File-system access for scopes, with all-or-nothing shadow sessions.
//!
//! # Core Concepts
//!
//! - [`FileSystem`]: read/write/delete/list surface
//! - [`PhysicalFileSystem`]: disk-backed, confined to a root directory
//! - [`FileSystems`]: routes through the active [`ShadowSession`], if any
//! - [`Completable`]: complete-then-dispose contract of a session
//!
//! # Example
//!
//! ```rust,ignore
//! use ambit_fs::{Completable, FileSystem, FileSystems, PhysicalFileSystem};
//! use std::{path::Path, sync::Arc};
//!
//! let fs = FileSystems::new(Arc::new(PhysicalFileSystem::new("/var/media")));
//! let mut session = fs.shadow()?;
//! fs.add_file(Path::new("1/a.png"), &bytes, true)?;
//! session.complete();
//! session.dispose()?; // written to disk here
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod physical;
pub mod shadow;

pub use error::{FsError, FsResult};
pub use physical::{normalize, FileSystem, PhysicalFileSystem};
pub use shadow::{Completable, FileSystems, ShadowSession};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
