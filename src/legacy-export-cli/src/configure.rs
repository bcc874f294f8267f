//! Configuration command handlers
//!
//! Handles the `configure` subcommand for remembering export defaults.

use crate::config::Config;
use anyhow::{Context, Result};
use legacy_export::AesKey;
use std::path::{Path, PathBuf};

/// Handle the configure command
pub fn handle(
    config_path: &Path,
    paks: Option<PathBuf>,
    content: Option<PathBuf>,
    aes_key: Option<String>,
    show: bool,
) -> Result<()> {
    let mut config = Config::load_from(config_path)?;

    if show {
        show_config(&config, config_path);
        return Ok(());
    }

    if paks.is_none() && content.is_none() && aes_key.is_none() {
        show_usage();
        return Ok(());
    }

    if let Some(key) = &aes_key {
        key.parse::<AesKey>()
            .context("AES key must be 64 hex digits")?;
    }

    apply(&mut config, paks, content, aes_key);
    config.save_to(config_path)?;
    println!("Config saved to: {}", config_path.display());

    Ok(())
}

fn apply(
    config: &mut Config,
    paks: Option<PathBuf>,
    content: Option<PathBuf>,
    aes_key: Option<String>,
) {
    if let Some(paks) = paks {
        config.paks_dir = Some(paks);
    }
    if let Some(content) = content {
        config.content_dir = Some(content);
    }
    if let Some(key) = aes_key {
        config.aes_key = Some(key);
    }
}

fn show_config(config: &Config, config_path: &Path) {
    let show = |label: &str, value: Option<&Path>| match value {
        Some(path) => println!("{}: {}", label, path.display()),
        None => println!("{}: not configured", label),
    };
    show("Paks folder", config.paks_dir.as_deref());
    show("Content folder", config.content_dir.as_deref());

    let key = if config.aes_key.is_some() { "custom" } else { "default" };
    println!("AES key: {}", key);
    println!(
        "Game: {} (engine {})",
        config.profile.root_namespace, config.profile.engine_association
    );
    println!("Config file: {}", config_path.display());
}

fn show_usage() {
    println!("Usage: legacy-export configure --paks <DIR> --content <DIR>");
    println!("   or: legacy-export configure --show");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_reload() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        handle(
            &path,
            Some(PathBuf::from("/g/PortalWars/Content/Paks")),
            None,
            None,
            false,
        )
        .unwrap();
        handle(&path, None, Some(PathBuf::from("/p/Content")), None, false).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.paks_dir,
            Some(PathBuf::from("/g/PortalWars/Content/Paks"))
        );
        assert_eq!(config.content_dir, Some(PathBuf::from("/p/Content")));
    }

    #[test]
    fn test_bad_key_is_not_saved() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        assert!(handle(&path, None, None, Some("xyz".to_string()), false).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_show_without_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        handle(&temp_dir.path().join("config.toml"), None, None, None, true).unwrap();
    }
}
