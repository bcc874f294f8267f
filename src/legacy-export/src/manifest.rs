//! Record of every file written during a run

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::info;

use crate::{Error, Result};

pub const DEFAULT_MANIFEST_NAME: &str = "CreatedList.txt";

#[derive(Debug, Default)]
struct Inner {
    written: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

/// Append-only list of written destination paths, safe to share across
/// writer threads. Order is the order writes completed in.
///
/// Entries are not deduplicated: a path written twice is listed twice.
#[derive(Debug, Default)]
pub struct ManifestRecorder {
    inner: Mutex<Inner>,
}

impl ManifestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a written path. Returns `false` if this path was already
    /// recorded during the run (a cross-package collision).
    pub fn record(&self, path: PathBuf) -> bool {
        let mut inner = self.lock();
        let first = inner.seen.insert(path.clone());
        inner.written.push(path);
        first
    }

    pub fn len(&self) -> usize {
        self.lock().written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the recorded paths in completion order
    pub fn entries(&self) -> Vec<PathBuf> {
        self.lock().written.clone()
    }

    /// One quoted path per line
    pub fn render(&self) -> String {
        let inner = self.lock();
        let mut out = String::new();
        for path in &inner.written {
            out.push('"');
            out.push_str(&path.to_string_lossy().replace('\\', "/"));
            out.push_str("\"\n");
        }
        out
    }

    /// Write the manifest to `path`
    pub fn flush(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::from_write(parent, e))?;
            }
        }
        std::fs::write(path, self.render()).map_err(|e| Error::from_write(path, e))?;

        info!(
            "Wrote {} created file(s) to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    // A panicking writer must not lose the paths recorded before it
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Manifest location: next to the content root, inside its parent.
pub fn manifest_path(content_root: &Path, file_name: &str) -> PathBuf {
    match content_root.parent() {
        Some(parent) => parent.join(file_name),
        None => content_root.join(file_name),
    }
}
