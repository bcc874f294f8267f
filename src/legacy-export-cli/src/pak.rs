//! Archive provider over a directory of traditional .pak files
//!
//! Uses `repak` for the container format. Paks are mounted in priority
//! order (base chunks first, `_P` patch paks last) so that a later pak
//! overrides an earlier one for the same path.

use aes::cipher::KeyInit;
use byteorder::{ByteOrder, LittleEndian};
use legacy_export::{
    extension_of, AesKey, ArchiveEntry, ArchiveProvider, Error, KeyGuid, Package, Result,
    SerializedAssets,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Tag at the start of every legacy package summary
pub const PACKAGE_FILE_TAG: u32 = 0x9E2A_83C1;

/// Files that belong to a package besides the header file
const COMPANION_EXTENSIONS: [&str; 3] = ["uexp", "ubulk", "uptnl"];

struct MountedPak {
    path: PathBuf,
    pak: repak::PakReader,
    file: BufReader<File>,
}

impl MountedPak {
    fn open(path: &Path, key: Option<&AesKey>) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut builder = repak::PakBuilder::new();
        if let Some(key) = key {
            let cipher = aes::Aes256::new_from_slice(&key.0)
                .map_err(|e| Error::InvalidKey(e.to_string()))?;
            builder = builder.key(cipher);
        }

        let pak = builder
            .reader(&mut reader)
            .map_err(|e| Error::Pak(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            pak,
            file: reader,
        })
    }

    fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        self.pak
            .get(name, &mut self.file)
            .map_err(|e| Error::Pak(format!("Failed to read '{}' from PAK: {}", name, e)))
    }
}

/// Where an archive path lives
#[derive(Debug, Clone)]
struct Location {
    pak: usize,
    name: String,
}

/// `ArchiveProvider` backed by the .pak files of one directory
pub struct PakProvider {
    package_extensions: Vec<String>,
    mounted: Vec<MountedPak>,
    pending: Vec<PathBuf>,
    index: HashMap<String, Location>,
    order: Vec<String>,
}

impl PakProvider {
    /// Mount every pak in `dir` that opens without a key.
    pub fn open(dir: &Path, package_extensions: &[String]) -> Result<Self> {
        let paks = find_pak_files(dir)?;
        if paks.is_empty() {
            return Err(Error::InvalidRoot {
                kind: "source",
                path: dir.to_path_buf(),
                reason: "no .pak files".to_string(),
            });
        }

        let mut provider = Self {
            package_extensions: package_extensions.to_vec(),
            mounted: Vec::new(),
            pending: Vec::new(),
            index: HashMap::new(),
            order: Vec::new(),
        };

        for path in paks {
            match MountedPak::open(&path, None) {
                Ok(mounted) => provider.mounted.push(mounted),
                Err(e) => {
                    debug!("{} needs a key: {}", path.display(), e);
                    provider.pending.push(path);
                }
            }
        }

        provider.reindex();
        info!(
            "Mounted {} PAK(s), {} waiting for a key",
            provider.mounted.len(),
            provider.pending()
        );
        #[cfg(not(feature = "uasset"))]
        info!(
            "Built without the `uasset` feature: export classes are not read, \
             so the compiled-content check is inactive"
        );
        Ok(provider)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn reindex(&mut self) {
        self.index.clear();
        self.order.clear();

        for (i, mounted) in self.mounted.iter().enumerate() {
            let mount_point = mounted.pak.mount_point().to_string();
            for name in mounted.pak.files() {
                let path = archive_path(&mount_point, &name);
                if self
                    .index
                    .insert(path.clone(), Location { pak: i, name })
                    .is_none()
                {
                    self.order.push(path);
                }
            }
        }
    }

    fn read(&mut self, path: &str) -> Option<Vec<u8>> {
        let location = self.index.get(path)?.clone();
        let mounted = &mut self.mounted[location.pak];
        match mounted.read(&location.name) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("{} ({})", e, mounted.path.display());
                None
            }
        }
    }

    fn is_package_path(&self, path: &str) -> bool {
        let ext = extension_of(path);
        self.package_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&ext))
    }

    #[cfg(feature = "uasset")]
    fn parse_package(&mut self, entry: &ArchiveEntry, header: &[u8]) -> Option<Package> {
        let exports = self.read(&companion_path(&entry.path, "uexp"));
        match crate::exports::read_exports(header, exports.as_deref()) {
            Ok(exports) => Some(Package::new(exports)),
            Err(e) => {
                debug!("Failed to parse {}: {}", entry.path, e);
                None
            }
        }
    }

    #[cfg(not(feature = "uasset"))]
    fn parse_package(&mut self, _entry: &ArchiveEntry, _header: &[u8]) -> Option<Package> {
        Some(Package::default())
    }
}

impl ArchiveProvider for PakProvider {
    fn submit_key(&mut self, _guid: KeyGuid, key: &AesKey) -> Result<usize> {
        let pending_before = self.pending.len();

        // Remount everything: paks with a plain index may still hold encrypted files
        let mut all: Vec<PathBuf> = self.mounted.iter().map(|m| m.path.clone()).collect();
        all.append(&mut self.pending);
        all.sort_by(|a, b| pak_priority(a).cmp(&pak_priority(b)));

        let mut mounted = Vec::with_capacity(all.len());
        let mut pending = Vec::new();
        for path in all {
            match MountedPak::open(&path, Some(key)) {
                Ok(m) => mounted.push(m),
                Err(e) => {
                    warn!("Key did not unlock {}: {}", path.display(), e);
                    pending.push(path);
                }
            }
        }

        self.mounted = mounted;
        self.pending = pending;
        self.reindex();

        let newly = pending_before.saturating_sub(self.pending.len());
        if pending_before > 0 && newly == 0 {
            return Err(Error::KeyRejected {
                pending: self.pending.len(),
            });
        }

        info!("Key accepted, {} PAK(s) mounted", self.mounted.len());
        Ok(newly)
    }

    fn entries(&self) -> Vec<ArchiveEntry> {
        self.order
            .iter()
            .map(|path| ArchiveEntry::new(path.clone(), self.is_package_path(path), 0))
            .collect()
    }

    fn read_file(&mut self, path: &str) -> Option<Vec<u8>> {
        self.read(path)
    }

    fn load_package(&mut self, entry: &ArchiveEntry) -> Option<Package> {
        let header = self.read(&entry.path)?;
        if header.len() < 4 || LittleEndian::read_u32(&header[..4]) != PACKAGE_FILE_TAG {
            debug!("{} is not a package", entry.path);
            return None;
        }

        self.parse_package(entry, &header)
    }

    fn serialize_package(&mut self, path: &str) -> Option<SerializedAssets> {
        let mut assets = SerializedAssets::new();
        assets.insert(path.to_string(), self.read(path)?);

        for ext in COMPANION_EXTENSIONS {
            let companion = companion_path(path, ext);
            if self.index.contains_key(&companion) {
                assets.insert(companion.clone(), self.read(&companion)?);
            }
        }

        Some(assets)
    }
}

/// Same package path with another extension
fn companion_path(path: &str, ext: &str) -> String {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) => format!("{}.{}", &path[..name_start + dot], ext),
        None => format!("{}.{}", path, ext),
    }
}

/// Archive-relative path of a pak file: mount point plus name, without
/// the leading `../` hops
pub fn archive_path(mount_point: &str, name: &str) -> String {
    let joined = format!("{}{}", mount_point, name).replace('\\', "/");
    let mut clean = joined.as_str();
    loop {
        if let Some(rest) = clean.strip_prefix("../") {
            clean = rest;
        } else if let Some(rest) = clean.strip_prefix("./") {
            clean = rest;
        } else if let Some(rest) = clean.strip_prefix('/') {
            clean = rest;
        } else {
            break;
        }
    }
    clean.to_string()
}

/// Patch paks (`*_P.pak`) mount after base paks
fn pak_priority(path: &Path) -> (bool, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    (stem.ends_with("_P"), stem)
}

/// Scan the top level of a directory for PAK files, in mount order
pub fn find_pak_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut paks = Vec::new();

    for entry in walkdir::WalkDir::new(dir.as_ref())
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.eq_ignore_ascii_case("pak") {
                    paks.push(path.to_path_buf());
                }
            }
        }
    }

    paks.sort_by(|a, b| pak_priority(a).cmp(&pak_priority(b)));
    Ok(paks)
}
