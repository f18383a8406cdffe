//! Loading metadata bundles from disk.
//!
//! [`FilesystemSource`] reads the directory layout used by fastlane's
//! `deliver`:
//!
//! ```text
//! metadata/
//! ├── copyright.txt
//! ├── primary_category.txt
//! ├── secondary_category.txt
//! └── {locale}/
//!     ├── name.txt
//!     ├── subtitle.txt
//!     ├── description.txt
//!     ├── keywords.txt
//!     ├── release_notes.txt
//!     ├── promotional_text.txt
//!     ├── support_url.txt
//!     ├── marketing_url.txt
//!     └── privacy_url.txt
//! screenshots/
//! └── {locale}/
//!     └── *.png | *.jpg | *.jpeg
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::types::{
    AppAssets, AppDetails, Dimensions, DisplayType, Locale, LocalizedMetadata, MetadataBundle,
    MetadataLocation, Screenshot,
};
use crate::{MetadataError, Result};

/// Produces the metadata bundle for a release.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Load and snapshot the metadata described by `location`.
    async fn load(&self, location: &MetadataLocation) -> Result<MetadataBundle>;
}

/// Reads metadata and screenshots from a fastlane-compatible directory tree.
#[derive(Debug, Clone, Default)]
pub struct FilesystemSource;

impl FilesystemSource {
    pub fn new() -> Self {
        Self
    }

    /// Read a text file, returning None if it doesn't exist or is blank.
    async fn read_text_file(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let trimmed = content.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MetadataError::Io(e)),
        }
    }

    async fn load_locale(dir: &Path) -> Result<LocalizedMetadata> {
        Ok(LocalizedMetadata {
            name: Self::read_text_file(&dir.join("name.txt")).await?,
            subtitle: Self::read_text_file(&dir.join("subtitle.txt")).await?,
            description: Self::read_text_file(&dir.join("description.txt")).await?,
            keywords: Self::read_text_file(&dir.join("keywords.txt")).await?,
            release_notes: Self::read_text_file(&dir.join("release_notes.txt")).await?,
            promotional_text: Self::read_text_file(&dir.join("promotional_text.txt")).await?,
            support_url: Self::read_text_file(&dir.join("support_url.txt")).await?,
            marketing_url: Self::read_text_file(&dir.join("marketing_url.txt")).await?,
            privacy_url: Self::read_text_file(&dir.join("privacy_url.txt")).await?,
        })
    }

    async fn load_details(dir: &Path) -> Result<AppDetails> {
        Ok(AppDetails {
            copyright: Self::read_text_file(&dir.join("copyright.txt")).await?,
            primary_category: Self::read_text_file(&dir.join("primary_category.txt")).await?,
            secondary_category: Self::read_text_file(&dir.join("secondary_category.txt")).await?,
        })
    }

    /// List locale directories under a path, skipping anything that is not a locale.
    async fn list_locale_directories(base_path: &Path) -> Result<Vec<(Locale, std::path::PathBuf)>> {
        let mut locales = Vec::new();

        let mut entries = match fs::read_dir(base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(locales),
            Err(e) => return Err(MetadataError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match Locale::new(name) {
                Ok(locale) => locales.push((locale, path)),
                Err(e) => warn!("Skipping invalid locale directory '{}': {}", name, e),
            }
        }

        locales.sort();
        Ok(locales)
    }

    async fn discover_screenshots(locale: &Locale, dir: &Path) -> Result<Vec<Screenshot>> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }

        // Upload order follows file name order
        paths.sort();

        Ok(paths
            .into_iter()
            .map(|path| {
                let dimensions = match image::image_dimensions(&path) {
                    Ok((width, height)) => Some(Dimensions::new(width, height)),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "could not read screenshot dimensions");
                        None
                    }
                };
                Screenshot {
                    display_type: dimensions.and_then(DisplayType::from_dimensions),
                    dimensions,
                    locale: locale.clone(),
                    path,
                }
            })
            .collect())
    }
}

#[async_trait]
impl MetadataSource for FilesystemSource {
    #[instrument(skip_all, fields(metadata_path = %location.metadata_path.display()))]
    async fn load(&self, location: &MetadataLocation) -> Result<MetadataBundle> {
        if !location.metadata_path.is_dir() {
            return Err(MetadataError::DirectoryNotFound(location.metadata_path.clone()));
        }

        let mut localizations = BTreeMap::new();
        for (locale, dir) in Self::list_locale_directories(&location.metadata_path).await? {
            let metadata = Self::load_locale(&dir).await?;
            if metadata.is_empty() {
                debug!(locale = %locale, "locale directory has no metadata files");
                continue;
            }
            localizations.insert(locale, metadata);
        }

        let mut screenshots = Vec::new();
        for (locale, dir) in Self::list_locale_directories(&location.screenshots_path).await? {
            screenshots.extend(Self::discover_screenshots(&locale, &dir).await?);
        }

        let bundle = MetadataBundle {
            localizations,
            details: Self::load_details(&location.metadata_path).await?,
            screenshots,
            price_tier: location.price_tier.clone(),
            assets: AppAssets {
                app_icon: location.app_icon.clone(),
                apple_watch_app_icon: location.apple_watch_app_icon.clone(),
            },
        };

        debug!(
            locales = bundle.localizations.len(),
            screenshots = bundle.screenshots.len(),
            "metadata bundle loaded"
        );
        Ok(bundle)
    }
}
