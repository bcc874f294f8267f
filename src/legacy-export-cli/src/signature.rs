//! Check that a mounted archive is the expected game build

use legacy_export::{ArchiveEntry, ArchiveProvider, Error, Result};
use tracing::info;

use crate::config::Profile;

/// The archive must ship `<ns>/<ns>.uproject` with the expected
/// `EngineAssociation`, and at least one entry named after the marker.
pub fn verify_project<P: ArchiveProvider>(
    provider: &mut P,
    entries: &[ArchiveEntry],
    profile: &Profile,
) -> Result<()> {
    let uproject = profile.uproject_path();
    let data = provider
        .read_file(&uproject)
        .ok_or_else(|| Error::SignatureMismatch(format!("{} not found", uproject)))?;

    let project: serde_json::Value = serde_json::from_slice(&data)
        .map_err(|e| Error::SignatureMismatch(format!("{} is not valid JSON: {}", uproject, e)))?;

    let engine = project
        .get("EngineAssociation")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if engine != profile.engine_association {
        return Err(Error::SignatureMismatch(format!(
            "engine {:?}, expected {:?}",
            engine, profile.engine_association
        )));
    }

    if !entries
        .iter()
        .any(|e| e.name().contains(&profile.signature_marker))
    {
        return Err(Error::SignatureMismatch(format!(
            "no {} content",
            profile.signature_marker
        )));
    }

    info!("Archive matches {} {}", profile.root_namespace, engine);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use legacy_export::{MemoryProvider, Package, SerializedAssets};

    fn provider(uproject: &[u8], with_marker: bool) -> MemoryProvider {
        let mut provider = MemoryProvider::new().with_file("PortalWars/PortalWars.uproject", uproject);
        if with_marker {
            provider = provider.with_package(
                "PortalWars/Content/Progression/BattlePass_S01.uasset",
                Package::default(),
                SerializedAssets::new(),
            );
        }
        provider
    }

    fn check(mut provider: MemoryProvider) -> Result<()> {
        let entries = provider.entries();
        verify_project(&mut provider, &entries, &Profile::default())
    }

    #[test]
    fn test_matching_project() {
        check(provider(br#"{"EngineAssociation": "4.23"}"#, true)).unwrap();
    }

    #[test]
    fn test_wrong_engine() {
        let err = check(provider(br#"{"EngineAssociation": "4.27"}"#, true)).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch(_)));
    }

    #[test]
    fn test_missing_marker() {
        let err = check(provider(br#"{"EngineAssociation": "4.23"}"#, false)).unwrap_err();
        assert!(matches!(err, Error::SignatureMismatch(_)));
    }

    #[test]
    fn test_missing_or_broken_uproject() {
        assert!(check(MemoryProvider::new()).is_err());
        assert!(check(provider(b"not json", true)).is_err());
    }
}
