//! legacy-export - selective asset export from legacy Unreal pak archives
//!
//! Takes an indexed archive (through [`ArchiveProvider`]), decides which
//! entries are source assets worth exporting, and writes their serialized
//! files into a project `Content` tree.
//!
//! # Pipeline
//!
//! - [`Classifier`] screens every entry (engine content, non-package files,
//!   compiled content)
//! - [`Exporter`] drives the provider and writes eligible packages in parallel
//! - [`Remapper`] turns archive paths into destination paths
//! - [`ManifestRecorder`] keeps the ordered list of written files

mod classify;
mod entry;
mod manifest;
mod pipeline;
pub mod provider;
mod remap;

pub use classify::{Classifier, ClassifierRules, SkipReason, Verdict};
pub use entry::{extension_of, ArchiveEntry, Export, Package, SerializedAssets};
pub use manifest::{manifest_path, ManifestRecorder, DEFAULT_MANIFEST_NAME};
pub use pipeline::{default_jobs, progress_bar, AssetsOutcome, ExportSummary, Exporter};
pub use provider::{AesKey, ArchiveProvider, KeyGuid, MemoryProvider};
pub use remap::{Remap, Remapper};

/// Errors from classification, remapping and export
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsafe archive path: {0}")]
    UnsafePath(String),

    #[error("Destination is not writable ({path}): {source}")]
    Environment {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid AES key: {0}")]
    InvalidKey(String),

    #[error("Decryption key rejected: {pending} pak(s) could not be mounted")]
    KeyRejected { pending: usize },

    #[error("PAK error: {0}")]
    Pak(String),

    #[error("Package error in {path}: {message}")]
    Package { path: String, message: String },

    #[error("Archive does not match the expected project: {0}")]
    SignatureMismatch(String),

    #[error("Invalid {kind} root {path}: {reason}")]
    InvalidRoot {
        kind: &'static str,
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("Failed to build export pool: {0}")]
    Pool(String),

    #[error("Gave up after {0} attempt(s) to select valid roots")]
    AttemptsExhausted(u32),
}

impl Error {
    /// Whether an IO failure means the destination tree as a whole is unusable
    /// rather than a single file being bad.
    pub fn is_environment_io(err: &std::io::Error) -> bool {
        matches!(
            err.kind(),
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::ReadOnlyFilesystem
        )
    }

    /// Wrap an IO error for `path`, escalating environment failures.
    pub fn from_write(path: &std::path::Path, err: std::io::Error) -> Self {
        if Self::is_environment_io(&err) {
            Error::Environment {
                path: path.to_path_buf(),
                source: err,
            }
        } else {
            Error::Io(std::io::Error::new(
                err.kind(),
                format!("{}: {}", path.display(), err),
            ))
        }
    }

    pub fn is_environment(&self) -> bool {
        matches!(self, Error::Environment { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
