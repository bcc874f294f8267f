//! Configuration management for legacy-export

use anyhow::{Context, Result};
use legacy_export::{ClassifierRules, DEFAULT_MANIFEST_NAME};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Key for the 1.9.2 build
pub const DEFAULT_AES_KEY: &str =
    "0xD73A797940208F2FB29256BE81A7CBC7B74CBF899441BB277F357F7F4577DBBB";

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Last accepted Paks directory
    pub paks_dir: Option<PathBuf>,
    /// Last accepted project Content directory
    pub content_dir: Option<PathBuf>,
    /// Overrides the profile key
    pub aes_key: Option<String>,
    #[serde(default)]
    pub profile: Profile,
}

/// Game-specific constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Project folder name inside the archive
    pub root_namespace: String,
    /// `EngineAssociation` the .uproject must declare
    pub engine_association: String,
    /// Some entry name must contain this for the archive to be accepted
    pub signature_marker: String,
    pub aes_key: String,
    pub key_guid: String,
    pub engine_prefix: String,
    pub package_extensions: Vec<String>,
    pub map_extension: String,
    pub ignored_extensions: Vec<String>,
    pub compiled_markers: Vec<String>,
    pub manifest_name: String,
}

impl Default for Profile {
    fn default() -> Self {
        let rules = ClassifierRules::default();
        Self {
            root_namespace: "PortalWars".to_string(),
            engine_association: "4.23".to_string(),
            signature_marker: "BattlePass_S01".to_string(),
            aes_key: DEFAULT_AES_KEY.to_string(),
            key_guid: "00000000000000000000000000000000".to_string(),
            engine_prefix: rules.engine_prefix,
            package_extensions: rules.package_extensions,
            map_extension: rules.map_extension,
            ignored_extensions: rules.ignored_extensions,
            compiled_markers: rules.compiled_markers,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
        }
    }
}

impl Profile {
    pub fn classifier_rules(&self) -> ClassifierRules {
        ClassifierRules {
            engine_prefix: self.engine_prefix.clone(),
            package_extensions: self.package_extensions.clone(),
            map_extension: self.map_extension.clone(),
            ignored_extensions: self.ignored_extensions.clone(),
            compiled_markers: self.compiled_markers.clone(),
        }
    }

    /// Path fragment every valid Paks directory contains
    pub fn paks_fragment(&self) -> String {
        format!("{}/Content/Paks", self.root_namespace)
    }

    /// Archive path of the project descriptor
    pub fn uproject_path(&self) -> String {
        format!("{0}/{0}.uproject", self.root_namespace)
    }
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("legacy-export");

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory at {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Key to submit: config override, then profile default
    pub fn effective_aes_key(&self) -> &str {
        self.aes_key.as_deref().unwrap_or(&self.profile.aes_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&temp_dir.path().join("nope.toml")).unwrap();
        assert!(config.paks_dir.is_none());
        assert_eq!(config.profile.root_namespace, "PortalWars");
        assert_eq!(config.effective_aes_key(), DEFAULT_AES_KEY);
    }

    #[test]
    fn test_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sub/config.toml");

        let config = Config {
            paks_dir: Some(PathBuf::from("/games/PortalWars/Content/Paks")),
            content_dir: Some(PathBuf::from("/work/Project/Content")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.paks_dir, config.paks_dir);
        assert_eq!(loaded.content_dir, config.content_dir);
        assert_eq!(loaded.profile.signature_marker, "BattlePass_S01");
    }

    #[test]
    fn test_partial_profile_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "aes_key = \"0x00\"\n\n[profile]\nroot_namespace = \"Other\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.profile.root_namespace, "Other");
        assert_eq!(config.profile.map_extension, "umap");
        assert_eq!(config.effective_aes_key(), "0x00");
        assert_eq!(config.profile.uproject_path(), "Other/Other.uproject");
        assert_eq!(config.profile.paks_fragment(), "Other/Content/Paks");
    }

    #[test]
    fn test_classifier_rules_follow_profile() {
        let profile = Profile {
            map_extension: "map".to_string(),
            ..Profile::default()
        };
        let rules = profile.classifier_rules();
        assert_eq!(rules.map_extension, "map");
        assert_eq!(rules.engine_prefix, "Engine");
    }
}
