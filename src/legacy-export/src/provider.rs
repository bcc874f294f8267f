//! Archive provider interface
//!
//! The provider owns archive indexing, decryption and package
//! (de)serialization. The pipeline only ever talks to it through
//! [`ArchiveProvider`]; constructing a provider is its `initialize` step.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::entry::{ArchiveEntry, Package, SerializedAssets};
use crate::{Error, Result};

/// Identifies which encrypted paks a key unlocks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyGuid(pub [u8; 16]);

impl FromStr for KeyGuid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let cleaned: String = s.chars().filter(|c| *c != '-').collect();
        let bytes = decode_hex(&cleaned, 16)?;
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&bytes);
        Ok(Self(guid))
    }
}

/// AES-256 archive key
#[derive(Clone, PartialEq, Eq)]
pub struct AesKey(pub [u8; 32]);

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AesKey(..)")
    }
}

impl FromStr for AesKey {
    type Err = Error;

    /// Parse a 64 digit hex key, with or without a `0x` prefix
    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_hex(s, 32)?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }
}

fn decode_hex(s: &str, len: usize) -> Result<Vec<u8>> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let bytes = hex::decode(digits).map_err(|e| Error::InvalidKey(e.to_string()))?;
    if bytes.len() != len {
        return Err(Error::InvalidKey(format!(
            "expected {} bytes, got {}",
            len,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Source of archive entries and package data
pub trait ArchiveProvider {
    /// Unlock encrypted content. Returns how many containers were mounted.
    fn submit_key(&mut self, guid: KeyGuid, key: &AesKey) -> Result<usize>;

    /// All indexed entries, in indexing order
    fn entries(&self) -> Vec<ArchiveEntry>;

    /// Raw bytes of any indexed file
    fn read_file(&mut self, path: &str) -> Option<Vec<u8>>;

    /// Deserialize one entry; `None` when it is not a loadable package
    fn load_package(&mut self, entry: &ArchiveEntry) -> Option<Package>;

    /// Serialize a package back into output files
    fn serialize_package(&mut self, path: &str) -> Option<SerializedAssets>;
}

/// In-memory provider for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryProvider {
    entries: Vec<ArchiveEntry>,
    packages: HashMap<String, Package>,
    serialized: HashMap<String, SerializedAssets>,
    files: HashMap<String, Vec<u8>>,
    required_key: Option<AesKey>,
    unlocked: bool,
    loads: AtomicUsize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide all entries until `key` is submitted
    pub fn with_required_key(mut self, key: AesKey) -> Self {
        self.required_key = Some(key);
        self
    }

    /// Add a loadable package and the files it serializes to
    pub fn with_package(
        mut self,
        path: &str,
        package: Package,
        serialized: SerializedAssets,
    ) -> Self {
        let size = serialized.values().map(|v| v.len() as u64).sum();
        self.entries.push(ArchiveEntry::new(path, true, size));
        self.packages.insert(path.to_string(), package);
        self.serialized.insert(path.to_string(), serialized);
        self
    }

    /// Add a package entry that fails to load
    pub fn with_broken_package(mut self, path: &str) -> Self {
        self.entries.push(ArchiveEntry::new(path, true, 0));
        self
    }

    /// Add a package that loads but fails to serialize
    pub fn with_unserializable_package(mut self, path: &str, package: Package) -> Self {
        self.entries.push(ArchiveEntry::new(path, true, 0));
        self.packages.insert(path.to_string(), package);
        self
    }

    /// Add a plain (non-package) file
    pub fn with_file(mut self, path: &str, data: &[u8]) -> Self {
        self.entries
            .push(ArchiveEntry::new(path, false, data.len() as u64));
        self.files.insert(path.to_string(), data.to_vec());
        self
    }

    /// Number of `load_package` calls so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn is_open(&self) -> bool {
        self.required_key.is_none() || self.unlocked
    }
}

impl ArchiveProvider for MemoryProvider {
    fn submit_key(&mut self, _guid: KeyGuid, key: &AesKey) -> Result<usize> {
        match &self.required_key {
            None => Ok(0),
            Some(required) if required == key => {
                let newly = usize::from(!self.unlocked);
                self.unlocked = true;
                Ok(newly)
            }
            Some(_) => Err(Error::KeyRejected {
                pending: usize::from(!self.unlocked),
            }),
        }
    }

    fn entries(&self) -> Vec<ArchiveEntry> {
        if self.is_open() {
            self.entries.clone()
        } else {
            Vec::new()
        }
    }

    fn read_file(&mut self, path: &str) -> Option<Vec<u8>> {
        if !self.is_open() {
            return None;
        }
        self.files.get(path).cloned()
    }

    fn load_package(&mut self, entry: &ArchiveEntry) -> Option<Package> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if !self.is_open() {
            return None;
        }
        self.packages.get(&entry.path).cloned()
    }

    fn serialize_package(&mut self, path: &str) -> Option<SerializedAssets> {
        if !self.is_open() {
            return None;
        }
        self.serialized.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "0xD73A797940208F2FB29256BE81A7CBC7B74CBF899441BB277F357F7F4577DBBB";

    #[test]
    fn test_parse_aes_key() {
        let key: AesKey = KEY_HEX.parse().unwrap();
        assert_eq!(key.0[0], 0xD7);
        assert_eq!(key.0[31], 0xBB);

        let bare: AesKey = KEY_HEX.trim_start_matches("0x").parse().unwrap();
        assert_eq!(key, bare);
    }

    #[test]
    fn test_parse_aes_key_rejects_bad_input() {
        assert!(matches!("0x1234".parse::<AesKey>(), Err(Error::InvalidKey(_))));
        assert!(matches!("zz".parse::<AesKey>(), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_parse_guid() {
        let guid: KeyGuid = "00000000000000000000000000000000".parse().unwrap();
        assert_eq!(guid, KeyGuid::default());

        let dashed: KeyGuid = "00000000-0000-0000-0000-000000000001".parse().unwrap();
        assert_eq!(dashed.0[15], 1);
    }

    #[test]
    fn test_aes_key_debug_hides_bytes() {
        let key: AesKey = KEY_HEX.parse().unwrap();
        assert_eq!(format!("{:?}", key), "AesKey(..)");
    }

    #[test]
    fn test_memory_provider_key_gate() {
        let key: AesKey = KEY_HEX.parse().unwrap();
        let mut provider = MemoryProvider::new()
            .with_required_key(key.clone())
            .with_file("Root/Root.uproject", b"{}");

        assert!(provider.entries().is_empty());
        assert!(provider.read_file("Root/Root.uproject").is_none());

        let wrong = AesKey([0u8; 32]);
        assert!(matches!(
            provider.submit_key(KeyGuid::default(), &wrong),
            Err(Error::KeyRejected { pending: 1 })
        ));

        assert_eq!(provider.submit_key(KeyGuid::default(), &key).unwrap(), 1);
        assert_eq!(provider.entries().len(), 1);
        assert_eq!(provider.read_file("Root/Root.uproject").unwrap(), b"{}");
    }
}
