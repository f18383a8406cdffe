//! Local validation of a metadata bundle before any remote write.
//!
//! ## Example
//!
//! ```rust
//! use launchpad_metadata::{BundleValidator, MetadataBundle, StoreValidator};
//!
//! let bundle = MetadataBundle::default();
//! let result = StoreValidator::new(false).validate(&bundle);
//!
//! for issue in result.errors() {
//!     eprintln!("{}", issue);
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::types::{limits, Locale, LocalizedMetadata, MetadataBundle};

/// Validation issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Must fix before upload.
    Error,
    /// Should fix but not blocking.
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A single validation issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Field path where the issue was found (e.g., "en-US.name").
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.field, self.message)
    }
}

/// Result of validation containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if validation passed (no errors). Warnings do not count.
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.errors().len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().len()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

/// Local consistency check over a metadata bundle.
///
/// Implementations must not talk to the store: this gate runs before any
/// remote mutation.
pub trait BundleValidator: Send + Sync {
    fn validate(&self, bundle: &MetadataBundle) -> ValidationResult;
}

/// Validates a bundle against App Store limits and formats.
#[derive(Debug, Clone, Default)]
pub struct StoreValidator {
    /// Treat warnings as errors.
    strict: bool,
}

impl StoreValidator {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    fn issue(&self, field: String, message: String) -> ValidationIssue {
        if self.strict {
            ValidationIssue::error(field, message)
        } else {
            ValidationIssue::warning(field, message)
        }
    }

    fn check_length(
        &self,
        result: &mut ValidationResult,
        locale: &Locale,
        field: &str,
        value: Option<&String>,
        max: usize,
    ) {
        if let Some(value) = value {
            let count = value.chars().count();
            if count > max {
                result.add(ValidationIssue::error(
                    format!("{}.{}", locale, field),
                    format!("exceeds {} characters ({})", max, count),
                ));
            }
        }
    }

    fn check_url(&self, result: &mut ValidationResult, locale: &Locale, field: &str, value: Option<&String>) {
        if let Some(url) = value {
            if !is_valid_url(url) {
                result.add(ValidationIssue::error(
                    format!("{}.{}", locale, field),
                    format!("'{}' is not a valid http(s) URL", url),
                ));
            }
        }
    }

    fn validate_locale(&self, result: &mut ValidationResult, locale: &Locale, metadata: &LocalizedMetadata) {
        self.check_length(result, locale, "name", metadata.name.as_ref(), limits::NAME_MAX);
        self.check_length(result, locale, "subtitle", metadata.subtitle.as_ref(), limits::SUBTITLE_MAX);
        self.check_length(result, locale, "description", metadata.description.as_ref(), limits::DESCRIPTION_MAX);
        self.check_length(result, locale, "keywords", metadata.keywords.as_ref(), limits::KEYWORDS_MAX);
        self.check_length(result, locale, "release_notes", metadata.release_notes.as_ref(), limits::RELEASE_NOTES_MAX);
        self.check_length(
            result,
            locale,
            "promotional_text",
            metadata.promotional_text.as_ref(),
            limits::PROMOTIONAL_TEXT_MAX,
        );

        self.check_url(result, locale, "support_url", metadata.support_url.as_ref());
        self.check_url(result, locale, "marketing_url", metadata.marketing_url.as_ref());
        self.check_url(result, locale, "privacy_url", metadata.privacy_url.as_ref());

        if metadata.description.is_none() {
            result.add(self.issue(
                format!("{}.description", locale),
                "description is missing".to_string(),
            ));
        }

        if let Some(keywords) = &metadata.keywords {
            if keywords.split(',').any(|k| k.trim().is_empty()) {
                result.add(self.issue(
                    format!("{}.keywords", locale),
                    "keywords contain empty entries".to_string(),
                ));
            }
        }
    }

    fn validate_screenshots(&self, result: &mut ValidationResult, bundle: &MetadataBundle) {
        for screenshot in &bundle.screenshots {
            if screenshot.display_type.is_none() {
                let message = match screenshot.dimensions {
                    Some(dims) => format!("unsupported dimensions {}x{}", dims.width, dims.height),
                    None => "image could not be read".to_string(),
                };
                result.add(ValidationIssue::error(
                    format!("screenshots.{}.{}", screenshot.locale, file_name(&screenshot.path)),
                    message,
                ));
            }
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for ((locale, display_type), shots) in bundle.screenshot_sets() {
            counts.insert(format!("screenshots.{}.{}", locale, display_type), shots.len());
        }
        for (field, count) in counts {
            if count > limits::SCREENSHOTS_PER_SET_MAX {
                result.add(ValidationIssue::error(
                    field,
                    format!(
                        "{} screenshots, at most {} are allowed",
                        count,
                        limits::SCREENSHOTS_PER_SET_MAX
                    ),
                ));
            }
        }
    }

    fn validate_icon(&self, result: &mut ValidationResult, field: &str, path: &Path) {
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if !is_png {
            result.add(ValidationIssue::error(field, "icon must be a PNG file"));
            return;
        }

        match image::image_dimensions(path) {
            Ok((w, h)) if w == limits::ICON_SIZE && h == limits::ICON_SIZE => {}
            Ok((w, h)) => result.add(ValidationIssue::error(
                field,
                format!(
                    "icon is {}x{}, expected {}x{}",
                    w,
                    h,
                    limits::ICON_SIZE,
                    limits::ICON_SIZE
                ),
            )),
            Err(e) => result.add(ValidationIssue::error(
                field,
                format!("cannot read {}: {}", path.display(), e),
            )),
        }
    }
}

impl BundleValidator for StoreValidator {
    fn validate(&self, bundle: &MetadataBundle) -> ValidationResult {
        let mut result = ValidationResult::new();

        if bundle.localizations.is_empty() {
            result.add(self.issue(
                "metadata".to_string(),
                "no localized metadata found".to_string(),
            ));
        }

        for (locale, metadata) in &bundle.localizations {
            self.validate_locale(&mut result, locale, metadata);
        }

        self.validate_screenshots(&mut result, bundle);

        if let Some(icon) = &bundle.assets.app_icon {
            self.validate_icon(&mut result, "assets.app_icon", icon);
        }
        if let Some(icon) = &bundle.assets.apple_watch_app_icon {
            self.validate_icon(&mut result, "assets.apple_watch_app_icon", icon);
        }

        if let Some(tier) = &bundle.price_tier {
            if tier.trim().is_empty() {
                result.add(ValidationIssue::error("price_tier", "price tier cannot be blank"));
            }
        }

        debug!(
            errors = result.error_count(),
            warnings = result.warning_count(),
            "bundle validated"
        );
        result
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Checks for an http(s) scheme followed by a plausible host.
fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    else {
        return false;
    };

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);

    host == "localhost" || (host.contains('.') && !host.starts_with('.') && !host.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DisplayType, Screenshot};
    use std::path::PathBuf;

    fn bundle_with(locale: &str, metadata: LocalizedMetadata) -> MetadataBundle {
        let mut bundle = MetadataBundle::default();
        bundle
            .localizations
            .insert(Locale::new(locale).unwrap(), metadata);
        bundle
    }

    fn complete() -> LocalizedMetadata {
        LocalizedMetadata {
            name: Some("Rocket".to_string()),
            description: Some("Launch things.".to_string()),
            keywords: Some("rocket,launch".to_string()),
            support_url: Some("https://example.com/support".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_bundle_is_clean() {
        let result = StoreValidator::new(false).validate(&bundle_with("en-US", complete()));
        assert!(result.is_valid());
        assert!(result.issues.is_empty(), "{:?}", result.issues);
    }

    #[test]
    fn test_name_too_long_is_error() {
        let mut metadata = complete();
        metadata.name = Some("x".repeat(limits::NAME_MAX + 1));

        let result = StoreValidator::new(false).validate(&bundle_with("en-US", metadata));

        assert!(!result.is_valid());
        assert_eq!(result.errors()[0].field, "en-US.name");
    }

    #[test]
    fn test_invalid_url_is_error() {
        let mut metadata = complete();
        metadata.marketing_url = Some("example.com".to_string());

        let result = StoreValidator::new(false).validate(&bundle_with("en-US", metadata));

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors()[0].field, "en-US.marketing_url");
    }

    #[test]
    fn test_missing_description_is_warning_unless_strict() {
        let mut metadata = complete();
        metadata.description = None;
        let bundle = bundle_with("en-US", metadata);

        let lenient = StoreValidator::new(false).validate(&bundle);
        assert!(lenient.is_valid());
        assert_eq!(lenient.warning_count(), 1);

        let strict = StoreValidator::new(true).validate(&bundle);
        assert!(!strict.is_valid());
    }

    #[test]
    fn test_unknown_screenshot_dimensions_are_errors() {
        let mut bundle = bundle_with("en-US", complete());
        bundle.screenshots.push(Screenshot {
            path: PathBuf::from("screenshots/en-US/odd.png"),
            locale: Locale::new("en-US").unwrap(),
            dimensions: Some(crate::Dimensions::new(10, 10)),
            display_type: None,
        });

        let result = StoreValidator::new(false).validate(&bundle);

        assert_eq!(result.error_count(), 1);
        assert!(result.errors()[0].message.contains("10x10"));
    }

    #[test]
    fn test_too_many_screenshots_per_set() {
        let mut bundle = bundle_with("en-US", complete());
        for i in 0..=limits::SCREENSHOTS_PER_SET_MAX {
            bundle.screenshots.push(Screenshot {
                path: PathBuf::from(format!("{}.png", i)),
                locale: Locale::new("en-US").unwrap(),
                dimensions: Some(crate::Dimensions::new(1290, 2796)),
                display_type: Some(DisplayType::Iphone67),
            });
        }

        let result = StoreValidator::new(false).validate(&bundle);

        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors()[0].field, "screenshots.en-US.APP_IPHONE_67");
    }

    #[test]
    fn test_icon_must_be_square_png() {
        let temp = tempfile::TempDir::new().unwrap();
        let icon = temp.path().join("icon.png");
        image::RgbImage::new(512, 512).save(&icon).unwrap();

        let mut bundle = bundle_with("en-US", complete());
        bundle.assets.app_icon = Some(icon);

        let result = StoreValidator::new(false).validate(&bundle);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors()[0].field, "assets.app_icon");

        bundle.assets.app_icon = Some(temp.path().join("icon.jpg"));
        let result = StoreValidator::new(false).validate(&bundle);
        assert!(result.errors()[0].message.contains("PNG"));
    }

    #[test]
    fn test_empty_bundle_warns() {
        let result = StoreValidator::new(false).validate(&MetadataBundle::default());
        assert!(result.is_valid());
        assert_eq!(result.warnings()[0].field, "metadata");
    }

    #[test]
    fn test_url_check() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://localhost:8080/path"));
        assert!(is_valid_url("https://example.com:443/a?b=c"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://nodot"));
    }
}
