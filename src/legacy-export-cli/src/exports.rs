//! Export class resolution for legacy packages (UE 4.23)

use legacy_export::Export;
use std::io::Cursor;
use unreal_asset::engine_version::EngineVersion;
use unreal_asset::exports::ExportBaseTrait;
use unreal_asset::reader::archive_trait::ArchiveTrait;
use unreal_asset::Asset;

/// Parse the package header (and its .uexp) into exports tagged with their
/// class names.
pub fn read_exports(header: &[u8], exports: Option<&[u8]>) -> Result<Vec<Export>, String> {
    let asset = Asset::new(
        Cursor::new(header),
        exports.map(Cursor::new),
        EngineVersion::VER_UE4_23,
    )
    .map_err(|e| e.to_string())?;

    Ok(asset
        .asset_data
        .exports
        .iter()
        .map(|export| {
            let base = export.get_base_export();
            let class = asset
                .get_import(base.class_index)
                .map(|import| import.object_name.get_content());
            Export::new(base.object_name.get_content(), class)
        })
        .collect())
}
