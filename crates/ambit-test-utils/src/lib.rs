//! Testing utilities for the Ambit workspace
//!
//! Shared fixtures: a tracing subscriber, temporary file systems, a
//! recording event aggregator and ready-made providers.

#![allow(missing_docs)]

use ambit_fs::{FileSystems, PhysicalFileSystem};
use ambit_notify::{EventAggregator, Notification};
use ambit_scope::{ScopeProvider, ScopeSettings};
use parking_lot::Mutex;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber honoring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// File systems over a temporary directory, removed on drop
pub struct TempFileSystems {
    dir: TempDir,
    file_systems: FileSystems,
}

impl TempFileSystems {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let file_systems = FileSystems::new(Arc::new(PhysicalFileSystem::new(dir.path())));
        Self { dir, file_systems }
    }

    pub fn file_systems(&self) -> &FileSystems {
        &self.file_systems
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Contents on disk, bypassing any shadow
    pub fn read_on_disk(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.dir.path().join(path)).ok()
    }
}

impl Default for TempFileSystems {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain notification carrying a label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNotification(pub &'static str);

impl Notification for TestNotification {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Aggregator remembering what was published, in order
#[derive(Debug, Default)]
pub struct RecordingAggregator {
    published: Mutex<Vec<String>>,
}

impl RecordingAggregator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Labels of published [`TestNotification`]s; other types as `Debug`
    pub fn published(&self) -> Vec<String> {
        self.published.lock().clone()
    }
}

impl EventAggregator for RecordingAggregator {
    fn publish(&self, notification: &dyn Notification) {
        let entry = match notification.as_any().downcast_ref::<TestNotification>() {
            Some(TestNotification(label)) => (*label).to_owned(),
            None => format!("{notification:?}"),
        };
        self.published.lock().push(entry);
    }
}

/// In-memory provider with default settings
pub fn provider() -> ScopeProvider {
    ScopeProvider::in_memory(ScopeSettings::default())
}

/// Provider with temporary file systems and a recording aggregator
pub fn provider_with_fixtures() -> (ScopeProvider, TempFileSystems, Arc<RecordingAggregator>) {
    let fs = TempFileSystems::new();
    let aggregator = RecordingAggregator::new();
    let provider = ScopeProvider::builder()
        .with_file_systems(fs.file_systems().clone())
        .with_event_aggregator(aggregator.clone())
        .build();
    (provider, fs, aggregator)
}
