//! Source and destination root validation

use legacy_export::{Error, Result};
use std::path::Path;

use crate::config::Profile;
use crate::pak::find_pak_files;

/// A Paks directory of the expected game: holds .pak files and sits at
/// `<ns>/Content/Paks`.
pub fn validate_source(path: &Path, profile: &Profile) -> Result<()> {
    let invalid = |reason: String| Error::InvalidRoot {
        kind: "source",
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }

    if find_pak_files(path)?.is_empty() {
        return Err(invalid(format!(
            "folder contains no Unreal paks (find {})",
            profile.paks_fragment()
        )));
    }

    let normalized = path.to_string_lossy().replace('\\', "/");
    if !normalized.trim_end_matches('/').contains(&profile.paks_fragment()) {
        return Err(invalid(format!("expected a {} folder", profile.paks_fragment())));
    }

    Ok(())
}

/// A project `Content` directory
pub fn validate_content(path: &Path) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidRoot {
        kind: "destination",
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if !path.is_dir() {
        return Err(invalid("not a directory"));
    }

    match path.file_name().and_then(|n| n.to_str()) {
        Some("Content") => Ok(()),
        _ => Err(invalid("folder is not a Content folder")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn paks_dir(base: &Path) -> std::path::PathBuf {
        let dir = base.join("PortalWars/Content/Paks");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_valid_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = paks_dir(temp_dir.path());
        fs::write(dir.join("pakchunk0-WindowsNoEditor.pak"), b"").unwrap();

        validate_source(&dir, &Profile::default()).unwrap();
    }

    #[test]
    fn test_source_without_paks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = paks_dir(temp_dir.path());
        fs::write(dir.join("readme.txt"), b"").unwrap();

        assert!(matches!(
            validate_source(&dir, &Profile::default()),
            Err(Error::InvalidRoot { kind: "source", .. })
        ));
    }

    #[test]
    fn test_source_in_wrong_place() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("Downloads");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("pakchunk0.pak"), b"").unwrap();

        assert!(validate_source(&dir, &Profile::default()).is_err());
    }

    #[test]
    fn test_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(validate_source(&temp_dir.path().join("nope"), &Profile::default()).is_err());
    }

    #[test]
    fn test_content_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let content = temp_dir.path().join("Project/Content");
        fs::create_dir_all(&content).unwrap();
        validate_content(&content).unwrap();

        let other = temp_dir.path().join("Project/Source");
        fs::create_dir_all(&other).unwrap();
        assert!(matches!(
            validate_content(&other),
            Err(Error::InvalidRoot { kind: "destination", .. })
        ));

        assert!(validate_content(&temp_dir.path().join("Missing/Content")).is_err());
    }
}
