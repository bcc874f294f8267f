//! Per-entry export eligibility
//!
//! Rules run in order and the first match wins:
//! 1. engine content (path prefix)
//! 2. non-package files and ignored extensions
//! 3. packages that fail to load
//! 4. compiled content: a non-map package with an export declaring every
//!    compiled marker at once
//!
//! Rules 1-2 never touch the package, so screening is cheap.

use serde::Serialize;

use crate::entry::{ArchiveEntry, Package};

/// Why an entry was not exported
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EngineContent,
    NotPackage,
    IgnoredExtension,
    LoadFailed,
    CompiledContent,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SkipReason::EngineContent => "engine content",
            SkipReason::NotPackage => "not a package",
            SkipReason::IgnoredExtension => "ignored extension",
            SkipReason::LoadFailed => "load failed",
            SkipReason::CompiledContent => "compiled content",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Eligible,
    Skip(SkipReason),
}

impl Verdict {
    pub fn is_eligible(self) -> bool {
        self == Verdict::Eligible
    }
}

/// Game-specific classification constants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    /// Paths starting with this are shipped engine content
    pub engine_prefix: String,
    /// Extensions the provider treats as packages
    pub package_extensions: Vec<String>,
    /// Map packages are never treated as compiled content
    pub map_extension: String,
    pub ignored_extensions: Vec<String>,
    /// Tags that must all sit on one export to mark a package as compiled
    pub compiled_markers: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            engine_prefix: "Engine".to_string(),
            package_extensions: vec!["uasset".to_string(), "umap".to_string()],
            map_extension: "umap".to_string(),
            ignored_extensions: ["bin", "ini", "txt", "uplugin", "upluginmanifest"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            compiled_markers: ["BlueprintGeneratedClass", "AnimMontage", "BlendSpace1D"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ClassifierRules {
    pub fn is_package_extension(&self, ext: &str) -> bool {
        self.package_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Decides per entry whether it is exported
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: ClassifierRules,
}

impl Classifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Rules that only need the entry itself.
    pub fn screen(&self, entry: &ArchiveEntry) -> Verdict {
        if entry.path.starts_with(&self.rules.engine_prefix) {
            return Verdict::Skip(SkipReason::EngineContent);
        }
        if !entry.is_package {
            return Verdict::Skip(SkipReason::NotPackage);
        }
        if self
            .rules
            .ignored_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(&entry.extension))
        {
            return Verdict::Skip(SkipReason::IgnoredExtension);
        }
        Verdict::Eligible
    }

    /// Rules that need the loaded package. Assumes `screen` already passed.
    pub fn inspect(&self, entry: &ArchiveEntry, package: Option<&Package>) -> Verdict {
        let Some(package) = package else {
            return Verdict::Skip(SkipReason::LoadFailed);
        };

        if !entry.extension.eq_ignore_ascii_case(&self.rules.map_extension)
            && package
                .exports
                .iter()
                .any(|export| export.has_all_tags(&self.rules.compiled_markers))
        {
            return Verdict::Skip(SkipReason::CompiledContent);
        }

        Verdict::Eligible
    }

    /// Full classification; `load` runs only when screening passes.
    pub fn classify<F>(&self, entry: &ArchiveEntry, load: F) -> Verdict
    where
        F: FnOnce() -> Option<Package>,
    {
        match self.screen(entry) {
            Verdict::Eligible => {
                let package = load();
                self.inspect(entry, package.as_ref())
            }
            skip => skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Export;
    use std::cell::Cell;

    const COMPILED: [&str; 3] = ["BlueprintGeneratedClass", "AnimMontage", "BlendSpace1D"];

    fn entry(path: &str) -> ArchiveEntry {
        let is_package = path.ends_with(".uasset") || path.ends_with(".umap");
        ArchiveEntry::new(path, is_package, 128)
    }

    #[test]
    fn test_engine_prefix_skips_regardless_of_package() {
        let classifier = Classifier::default();
        let loads = Cell::new(0);
        let verdict = classifier.classify(&entry("Engine/Content/BasicShapes/Cube.uasset"), || {
            loads.set(loads.get() + 1);
            Some(Package::default())
        });
        assert_eq!(verdict, Verdict::Skip(SkipReason::EngineContent));
        assert_eq!(loads.get(), 0);
    }

    #[test]
    fn test_engine_prefix_is_plain_string_prefix() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.screen(&entry("EngineTools/Content/Thing.uasset")),
            Verdict::Skip(SkipReason::EngineContent)
        );
    }

    #[test]
    fn test_non_package_never_loads() {
        let classifier = Classifier::default();
        for path in [
            "PortalWars/Content/UI/icon.txt",
            "PortalWars/Config/DefaultGame.ini",
            "PortalWars/Plugins/Foo/Foo.uplugin",
            "PortalWars/Content/Data/blob.bin",
            "PortalWars/Content/Weapons/rifle.uexp",
        ] {
            let verdict = classifier.classify(&entry(path), || panic!("loaded {}", path));
            assert_eq!(verdict, Verdict::Skip(SkipReason::NotPackage), "{}", path);
        }
    }

    #[test]
    fn test_ignored_extension_on_package_flag() {
        // A provider may flag odd files as packages; the ignore list still wins
        let classifier = Classifier::default();
        let odd = ArchiveEntry::new("PortalWars/Content/notes.txt", true, 4);
        let verdict = classifier.classify(&odd, || panic!("should not load"));
        assert_eq!(verdict, Verdict::Skip(SkipReason::IgnoredExtension));
    }

    #[test]
    fn test_load_failure_is_soft_skip() {
        let classifier = Classifier::default();
        let verdict = classifier.classify(&entry("PortalWars/Content/Broken.uasset"), || None);
        assert_eq!(verdict, Verdict::Skip(SkipReason::LoadFailed));
    }

    #[test]
    fn test_compiled_content_skipped() {
        let classifier = Classifier::default();
        let package = Package::new(vec![
            Export::new("Default__Thing", ["Object"]),
            Export::new("Thing_C", COMPILED),
        ]);
        let verdict = classifier.inspect(&entry("PortalWars/Content/Thing.uasset"), Some(&package));
        assert_eq!(verdict, Verdict::Skip(SkipReason::CompiledContent));
    }

    #[test]
    fn test_compiled_content_superset_still_skipped() {
        let classifier = Classifier::default();
        let mut tags: Vec<&str> = COMPILED.to_vec();
        tags.push("Extra");
        let package = Package::new(vec![Export::new("Thing_C", tags)]);
        let verdict = classifier.inspect(&entry("PortalWars/Content/Thing.uasset"), Some(&package));
        assert_eq!(verdict, Verdict::Skip(SkipReason::CompiledContent));
    }

    #[test]
    fn test_markers_split_across_exports_are_eligible() {
        let classifier = Classifier::default();
        let package = Package::new(vec![
            Export::new("A", ["BlueprintGeneratedClass"]),
            Export::new("B", ["AnimMontage", "BlendSpace1D"]),
        ]);
        let verdict = classifier.inspect(&entry("PortalWars/Content/Thing.uasset"), Some(&package));
        assert_eq!(verdict, Verdict::Eligible);
    }

    #[test]
    fn test_map_extension_carve_out() {
        let classifier = Classifier::default();
        let package = Package::new(vec![Export::new("Level_C", COMPILED)]);
        let verdict = classifier.inspect(&entry("PortalWars/Content/Maps/Arena.umap"), Some(&package));
        assert_eq!(verdict, Verdict::Eligible);
    }

    #[test]
    fn test_eligible_package() {
        let classifier = Classifier::default();
        let package = Package::new(vec![
            Export::new("Rifle", ["StaticMesh"]),
            Export::new("Rifle_Mat", ["Material"]),
        ]);
        let verdict = classifier.classify(&entry("PortalWars/Content/Weapons/Rifle.uasset"), || {
            Some(package.clone())
        });
        assert!(verdict.is_eligible());
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::CompiledContent.to_string(), "compiled content");
        assert_eq!(SkipReason::EngineContent.to_string(), "engine content");
    }
}
