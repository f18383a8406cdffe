//! Reading identifiers out of `.ipa` archives

use async_trait::async_trait;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::ArtifactInspector;
use crate::types::BinaryInfo;

/// Reads `Payload/<name>.app/Info.plist` from an `.ipa`
#[derive(Debug, Clone, Default)]
pub struct IpaInspector;

impl IpaInspector {
    pub fn new() -> Self {
        Self
    }
}

fn is_app_info_plist(name: &str) -> bool {
    let parts: Vec<&str> = name.split('/').collect();
    matches!(parts.as_slice(), ["Payload", app, "Info.plist"] if app.ends_with(".app"))
}

fn read_info(path: &Path) -> Result<BinaryInfo> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| StoreError::InvalidArtifact(format!("Invalid ipa file: {}", e)))?;

    let plist_name = archive
        .file_names()
        .find(|name| is_app_info_plist(name))
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidArtifact("No Payload/*.app/Info.plist in ipa".to_string()))?;

    let mut contents = Vec::new();
    archive
        .by_name(&plist_name)
        .map_err(|e| StoreError::InvalidArtifact(format!("Failed to read {}: {}", plist_name, e)))?
        .read_to_end(&mut contents)?;

    let plist = plist::Value::from_reader(std::io::Cursor::new(contents))
        .map_err(|e| StoreError::InvalidArtifact(format!("Failed to parse Info.plist: {}", e)))?;
    let dict = plist
        .as_dictionary()
        .ok_or_else(|| StoreError::InvalidArtifact("Info.plist is not a dictionary".to_string()))?;

    let string = |key: &str| dict.get(key).and_then(|v| v.as_string()).map(str::to_string);

    let bundle_id = string("CFBundleIdentifier")
        .ok_or_else(|| StoreError::InvalidArtifact("Info.plist has no CFBundleIdentifier".to_string()))?;

    Ok(BinaryInfo {
        bundle_id,
        version: string("CFBundleShortVersionString"),
        build_number: string("CFBundleVersion"),
    })
}

#[async_trait]
impl ArtifactInspector for IpaInspector {
    async fn inspect_ipa(&self, path: &Path) -> Result<BinaryInfo> {
        let owned: PathBuf = path.to_path_buf();
        let info = tokio::task::spawn_blocking(move || read_info(&owned))
            .await
            .map_err(|e| StoreError::Other(format!("ipa inspection panicked: {}", e)))??;

        debug!(
            bundle_id = %info.bundle_id,
            version = ?info.version,
            "Inspected {}",
            path.display()
        );
        Ok(info)
    }
}
