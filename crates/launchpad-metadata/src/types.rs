//! Metadata bundle types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::MetadataError;

/// Character limits for App Store metadata fields.
pub mod limits {
    /// Maximum characters for app name.
    pub const NAME_MAX: usize = 30;
    /// Maximum characters for subtitle.
    pub const SUBTITLE_MAX: usize = 30;
    /// Maximum characters for description.
    pub const DESCRIPTION_MAX: usize = 4000;
    /// Maximum characters for keywords.
    pub const KEYWORDS_MAX: usize = 100;
    /// Maximum characters for release notes.
    pub const RELEASE_NOTES_MAX: usize = 4000;
    /// Maximum characters for promotional text.
    pub const PROMOTIONAL_TEXT_MAX: usize = 170;
    /// Maximum screenshots per display type and locale.
    pub const SCREENSHOTS_PER_SET_MAX: usize = 10;
    /// Required icon edge length in pixels.
    pub const ICON_SIZE: u32 = 1024;
}

/// Where the metadata for a release lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataLocation {
    /// Directory with per-locale text files.
    pub metadata_path: PathBuf,
    /// Directory with per-locale screenshot folders.
    pub screenshots_path: PathBuf,
    /// App Store Connect price point id to apply.
    pub price_tier: Option<String>,
    /// Large app icon.
    pub app_icon: Option<PathBuf>,
    /// Apple Watch app icon.
    pub apple_watch_app_icon: Option<PathBuf>,
}

impl Default for MetadataLocation {
    fn default() -> Self {
        Self {
            metadata_path: PathBuf::from("metadata"),
            screenshots_path: PathBuf::from("screenshots"),
            price_tier: None,
            app_icon: None,
            apple_watch_app_icon: None,
        }
    }
}

/// A locale identifier.
///
/// Accepts BCP 47 style tags as used by App Store Connect: a language with an
/// optional region (`en-US`) or script (`zh-Hans`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    language: String,
    subtag: Option<String>,
}

impl Locale {
    /// Parses a locale code such as `en-US`, `de_DE`, `ja` or `zh-Hans`.
    pub fn new(code: &str) -> Result<Self, MetadataError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(MetadataError::InvalidFormat(
                "Locale code cannot be empty".to_string(),
            ));
        }

        let mut parts = code.split(['-', '_']);
        let language = parts.next().unwrap_or_default().to_lowercase();
        if language.len() < 2 || language.len() > 3 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MetadataError::InvalidFormat(format!(
                "Invalid language code: {}",
                language
            )));
        }

        let subtag = match parts.next() {
            None => None,
            Some(region) if region.len() == 2 && region.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(region.to_uppercase())
            }
            Some(script) if script.len() == 4 && script.chars().all(|c| c.is_ascii_alphabetic()) => {
                let mut chars = script.chars();
                let first = chars.next().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
                Some(format!("{}{}", first, chars.as_str().to_lowercase()))
            }
            Some(other) => {
                return Err(MetadataError::InvalidFormat(format!(
                    "Invalid region code: {}",
                    other
                )))
            }
        };

        if parts.next().is_some() {
            return Err(MetadataError::InvalidFormat(format!(
                "Unsupported locale code: {}",
                code
            )));
        }

        Ok(Self { language, subtag })
    }

    /// Returns the language code.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the full locale code (e.g., "en-US").
    pub fn code(&self) -> String {
        match &self.subtag {
            Some(subtag) => format!("{}-{}", self.language, subtag),
            None => self.language.clone(),
        }
    }
}

impl TryFrom<String> for Locale {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Locale::new(&value)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.code()
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Locale-specific listing content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedMetadata {
    /// App name (max 30 characters).
    pub name: Option<String>,
    /// App subtitle (max 30 characters).
    pub subtitle: Option<String>,
    /// App description (max 4000 characters).
    pub description: Option<String>,
    /// Comma-separated search keywords (max 100 characters).
    pub keywords: Option<String>,
    /// What's new in this version.
    pub release_notes: Option<String>,
    /// Promotional text (max 170 characters).
    pub promotional_text: Option<String>,
    pub support_url: Option<String>,
    pub marketing_url: Option<String>,
    pub privacy_url: Option<String>,
}

impl LocalizedMetadata {
    /// True when the locale directory held no usable text at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Non-localized app details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDetails {
    pub copyright: Option<String>,
    /// App Store Connect category id, e.g. `GAMES` or `PRODUCTIVITY`.
    pub primary_category: Option<String>,
    pub secondary_category: Option<String>,
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// App Store Connect screenshot display types we can detect from image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DisplayType {
    Iphone67,
    Iphone65,
    Iphone61,
    Iphone55,
    IpadPro129,
    IpadPro11,
    Ipad105,
    AppleTv,
    Desktop,
}

impl DisplayType {
    /// Detects the display type from portrait or landscape pixel dimensions.
    pub fn from_dimensions(dims: Dimensions) -> Option<Self> {
        let (short, long) = if dims.width <= dims.height {
            (dims.width, dims.height)
        } else {
            (dims.height, dims.width)
        };

        match (short, long) {
            (1290, 2796) => Some(Self::Iphone67),
            (1242, 2688) | (1284, 2778) => Some(Self::Iphone65),
            (1170, 2532) | (1179, 2556) => Some(Self::Iphone61),
            (1242, 2208) => Some(Self::Iphone55),
            (2048, 2732) => Some(Self::IpadPro129),
            (1668, 2388) => Some(Self::IpadPro11),
            (1668, 2224) => Some(Self::Ipad105),
            (1080, 1920) | (2160, 3840) => Some(Self::AppleTv),
            (800, 1280) | (900, 1440) | (1600, 2560) | (1800, 2880) => Some(Self::Desktop),
            _ => None,
        }
    }

    /// The `screenshotDisplayType` value App Store Connect expects.
    pub fn asc_name(&self) -> &'static str {
        match self {
            Self::Iphone67 => "APP_IPHONE_67",
            Self::Iphone65 => "APP_IPHONE_65",
            Self::Iphone61 => "APP_IPHONE_61",
            Self::Iphone55 => "APP_IPHONE_55",
            Self::IpadPro129 => "APP_IPAD_PRO_3GEN_129",
            Self::IpadPro11 => "APP_IPAD_PRO_3GEN_11",
            Self::Ipad105 => "APP_IPAD_105",
            Self::AppleTv => "APP_APPLE_TV",
            Self::Desktop => "APP_DESKTOP",
        }
    }
}

impl std::fmt::Display for DisplayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.asc_name())
    }
}

/// A screenshot discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub path: PathBuf,
    pub locale: Locale,
    /// `None` when the image header could not be read.
    pub dimensions: Option<Dimensions>,
    /// `None` when the dimensions match no known display.
    pub display_type: Option<DisplayType>,
}

/// Icon files that accompany the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppAssets {
    pub app_icon: Option<PathBuf>,
    pub apple_watch_app_icon: Option<PathBuf>,
}

impl AppAssets {
    pub fn is_empty(&self) -> bool {
        self.app_icon.is_none() && self.apple_watch_app_icon.is_none()
    }
}

/// In-memory snapshot of everything the metadata-class stages push.
///
/// Built fresh for each run and dropped once those stages complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataBundle {
    /// Localized listing text keyed by locale.
    pub localizations: BTreeMap<Locale, LocalizedMetadata>,
    pub details: AppDetails,
    /// Screenshots ordered by locale, then file name.
    pub screenshots: Vec<Screenshot>,
    pub price_tier: Option<String>,
    pub assets: AppAssets,
}

impl MetadataBundle {
    /// Screenshots grouped by locale and display type, preserving file order.
    ///
    /// Screenshots with an unknown display type are left out.
    pub fn screenshot_sets(&self) -> BTreeMap<(Locale, DisplayType), Vec<&Screenshot>> {
        let mut sets: BTreeMap<(Locale, DisplayType), Vec<&Screenshot>> = BTreeMap::new();
        for screenshot in &self.screenshots {
            if let Some(display_type) = screenshot.display_type {
                sets.entry((screenshot.locale.clone(), display_type))
                    .or_default()
                    .push(screenshot);
            }
        }
        sets
    }

    /// Locales present in either the text metadata or the screenshots.
    pub fn locales(&self) -> Vec<Locale> {
        let mut locales: Vec<Locale> = self.localizations.keys().cloned().collect();
        for screenshot in &self.screenshots {
            if !locales.contains(&screenshot.locale) {
                locales.push(screenshot.locale.clone());
            }
        }
        locales.sort();
        locales
    }
}
