//! `.itmsp` package generation for iTMSTransporter
//!
//! A package is a directory named `<apple_id>.itmsp` holding a copy of the
//! binary and a `metadata.xml` describing it.

use async_trait::async_trait;
use md5::{Digest, Md5};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::traits::PackageBuilder;
use crate::types::Platform;

const METADATA_VERSION: &str = "software5.4";

/// Size and checksum of the packaged binary
#[derive(Debug, Clone, PartialEq, Eq)]
struct DataFile {
    file_name: String,
    size: u64,
    md5: String,
}

/// Escape text for use inside XML attributes and elements
fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn metadata_xml(app_id: &str, platform: Platform, asset_type: &str, file: &DataFile) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://apple.com/itunes/importer" version="{version}">
  <software_assets apple_id="{app_id}" app_platform="{platform}">
    <asset type="{asset_type}">
      <data_file>
        <size>{size}</size>
        <file_name>{file_name}</file_name>
        <checksum type="md5">{md5}</checksum>
      </data_file>
    </asset>
  </software_assets>
</package>
"#,
        version = METADATA_VERSION,
        app_id = xml_escape(app_id),
        platform = platform.package_name(),
        asset_type = asset_type,
        size = file.size,
        file_name = xml_escape(&file.file_name),
        md5 = file.md5,
    )
}

/// Stream a file through MD5
async fn checksum(path: &Path) -> Result<(u64, String)> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    Ok((size, format!("{:x}", hasher.finalize())))
}

async fn build_package(
    app_id: &str,
    artifact: &Path,
    staging_dir: &Path,
    platform: Platform,
    asset_type: &str,
) -> Result<PathBuf> {
    if !artifact.is_file() {
        return Err(StoreError::InvalidArtifact(format!(
            "{} does not exist",
            artifact.display()
        )));
    }
    let file_name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::InvalidArtifact(format!("bad artifact path {}", artifact.display())))?
        .to_string();

    let package = staging_dir.join(format!("{}.itmsp", app_id));
    if package.exists() {
        debug!("Removing stale package {}", package.display());
        tokio::fs::remove_dir_all(&package).await?;
    }
    tokio::fs::create_dir_all(&package).await?;

    tokio::fs::copy(artifact, package.join(&file_name)).await?;
    let (size, md5) = checksum(artifact).await?;

    let data_file = DataFile { file_name, size, md5 };
    tokio::fs::write(
        package.join("metadata.xml"),
        metadata_xml(app_id, platform, asset_type, &data_file),
    )
    .await?;

    info!("Built package {} ({} bytes)", package.display(), size);
    Ok(package)
}

/// Packages an `.ipa` for iOS or tvOS
#[derive(Debug, Clone, Default)]
pub struct IpaPackageBuilder {
    platform: Platform,
}

impl IpaPackageBuilder {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl PackageBuilder for IpaPackageBuilder {
    #[instrument(skip(self))]
    async fn generate(&self, app_id: &str, artifact: &Path, staging_dir: &Path) -> Result<PathBuf> {
        build_package(app_id, artifact, staging_dir, self.platform, "bundle").await
    }
}

/// Packages a macOS installer `.pkg`
#[derive(Debug, Clone, Default)]
pub struct PkgPackageBuilder;

impl PkgPackageBuilder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackageBuilder for PkgPackageBuilder {
    #[instrument(skip(self))]
    async fn generate(&self, app_id: &str, artifact: &Path, staging_dir: &Path) -> Result<PathBuf> {
        build_package(app_id, artifact, staging_dir, Platform::Osx, "product-archive").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b <c> \"d\" 'e'"), "a&amp;b &lt;c&gt; &quot;d&quot; &apos;e&apos;");
    }

    #[tokio::test]
    async fn test_ipa_package_layout() {
        let temp = TempDir::new().unwrap();
        let ipa = temp.path().join("Rocket & Co.ipa");
        std::fs::write(&ipa, b"abc").unwrap();
        let staging = temp.path().join("staging");

        let package = IpaPackageBuilder::new(Platform::Ios)
            .generate("42", &ipa, &staging)
            .await
            .unwrap();

        assert_eq!(package, staging.join("42.itmsp"));
        assert_eq!(std::fs::read(package.join("Rocket & Co.ipa")).unwrap(), b"abc");

        let xml = std::fs::read_to_string(package.join("metadata.xml")).unwrap();
        assert!(xml.contains(r#"version="software5.4""#));
        assert!(xml.contains(r#"apple_id="42" app_platform="ios""#));
        assert!(xml.contains(r#"<asset type="bundle">"#));
        assert!(xml.contains("<size>3</size>"));
        assert!(xml.contains("<file_name>Rocket &amp; Co.ipa</file_name>"));
        assert!(xml.contains(r#"<checksum type="md5">900150983cd24fb0d6963f7d28e17f72</checksum>"#));
    }

    #[tokio::test]
    async fn test_pkg_package_is_product_archive() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("Rocket.pkg");
        std::fs::write(&pkg, b"installer").unwrap();

        let package = PkgPackageBuilder::new()
            .generate("42", &pkg, temp.path())
            .await
            .unwrap();

        let xml = std::fs::read_to_string(package.join("metadata.xml")).unwrap();
        assert!(xml.contains(r#"app_platform="osx""#));
        assert!(xml.contains(r#"<asset type="product-archive">"#));
    }

    #[tokio::test]
    async fn test_rebuild_replaces_stale_package() {
        let temp = TempDir::new().unwrap();
        let ipa = temp.path().join("Rocket.ipa");
        std::fs::write(&ipa, b"abc").unwrap();
        let stale = temp.path().join("42.itmsp");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("Old.ipa"), b"old").unwrap();

        let package = IpaPackageBuilder::default()
            .generate("42", &ipa, temp.path())
            .await
            .unwrap();

        assert!(!package.join("Old.ipa").exists());
        assert!(package.join("Rocket.ipa").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let err = IpaPackageBuilder::default()
            .generate("42", &temp.path().join("missing.ipa"), temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArtifact(_)));
    }
}
