//! Archive entries, packages and their exports

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Serialized files for one package, keyed by archive-relative output path
pub type SerializedAssets = BTreeMap<String, Vec<u8>>;

/// One indexed file inside the source archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    /// Archive-relative path, e.g. "PortalWars/Content/Maps/Lobby.umap"
    pub path: String,
    /// Lowercase extension without the dot
    pub extension: String,
    /// Whether the provider recognizes this entry as a loadable package
    pub is_package: bool,
    /// Uncompressed size in bytes
    pub size: u64,
}

impl ArchiveEntry {
    /// Build an entry, deriving the extension from the path.
    pub fn new(path: impl Into<String>, is_package: bool, size: u64) -> Self {
        let path = path.into();
        let extension = extension_of(&path);
        Self {
            path,
            extension,
            is_package,
            size,
        }
    }

    /// File name component of the path
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Lowercase extension of an archive path ("" when there is none)
pub fn extension_of(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// One object inside a package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    /// Class name and declared capability names of the object
    pub type_tags: BTreeSet<String>,
}

impl Export {
    pub fn new<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            type_tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// True when every tag in `tags` is declared on this export
    pub fn has_all_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().all(|tag| self.type_tags.contains(tag.as_ref()))
    }
}

/// Deserialized form of one entry; lives for a single pipeline iteration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub exports: Vec<Export>,
}

impl Package {
    pub fn new(exports: Vec<Export>) -> Self {
        Self { exports }
    }
}
