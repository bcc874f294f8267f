//! Archive path to destination path mapping

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

const WRITE_CHECK_NAME: &str = ".legacy-export-write-check";

/// Where a serialized file should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remap {
    Destination(PathBuf),
    /// Plugin content; never written
    Excluded,
}

/// Maps `<ns>/Content/<rest>` onto `<content_root>/<rest>`
#[derive(Debug, Clone)]
pub struct Remapper {
    content_root: String,
    content_prefix: String,
    plugins_segment: String,
}

impl Remapper {
    pub fn new(content_root: impl AsRef<Path>, root_namespace: &str) -> Self {
        let root = normalize_separators(&content_root.as_ref().to_string_lossy());
        let trimmed = root.trim_end_matches('/');
        // Keep a bare "/" root intact
        let content_root = if trimmed.is_empty() && root.starts_with('/') {
            "/".to_string()
        } else {
            trimmed.to_string()
        };

        Self {
            content_root,
            content_prefix: format!("{}/Content/", root_namespace),
            plugins_segment: format!("{}/Plugins/", root_namespace),
        }
    }

    /// Destination content root with `/` separators
    pub fn content_root(&self) -> &str {
        &self.content_root
    }

    /// Compute the destination for an archive-relative output path.
    ///
    /// Paths outside `<ns>/Content/` that are not plugin content are joined
    /// onto the content root as they are.
    pub fn remap(&self, archive_path: &str) -> Result<Remap> {
        let normalized = normalize_separators(archive_path);

        if normalized.contains(&self.plugins_segment) {
            return Ok(Remap::Excluded);
        }

        let rest = normalized
            .strip_prefix(&self.content_prefix)
            .unwrap_or(&normalized);

        let mut parts = Vec::new();
        for part in rest.split('/') {
            match part {
                "" | "." => continue,
                ".." => return Err(Error::UnsafePath(archive_path.to_string())),
                p if p.contains(':') => return Err(Error::UnsafePath(archive_path.to_string())),
                p => parts.push(p),
            }
        }

        if parts.is_empty() {
            return Err(Error::UnsafePath(archive_path.to_string()));
        }

        let relative = parts.join("/");
        let destination = if self.content_root.ends_with('/') {
            format!("{}{}", self.content_root, relative)
        } else {
            format!("{}/{}", self.content_root, relative)
        };

        Ok(Remap::Destination(PathBuf::from(destination)))
    }

    /// Write `bytes` to `destination`, replacing any existing file.
    pub fn write(destination: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::from_write(parent, e))?;
        }

        if destination.exists() {
            fs::remove_file(destination).map_err(|e| Error::from_write(destination, e))?;
        }

        fs::write(destination, bytes).map_err(|e| Error::from_write(destination, e))
    }

    /// Check that the content root still takes new files. A failure here is
    /// an `Error::Environment`: no later write can succeed either.
    pub fn check_root(&self) -> Result<()> {
        let root = Path::new(&self.content_root);
        let unusable = |source: io::Error| Error::Environment {
            path: root.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(root).map_err(unusable)?;
        if !metadata.is_dir() {
            return Err(unusable(io::Error::new(
                io::ErrorKind::NotADirectory,
                "content root is not a directory",
            )));
        }

        let marker = root.join(WRITE_CHECK_NAME);
        fs::write(&marker, b"").map_err(unusable)?;
        match fs::remove_file(&marker) {
            // Another writer's check already removed it
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result.map_err(unusable),
        }
    }
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
