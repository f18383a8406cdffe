//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "launchpad.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "launchpad.yaml";

/// Default metadata directory
pub const DEFAULT_METADATA_PATH: &str = "./metadata";

/// Default screenshots directory
pub const DEFAULT_SCREENSHOTS_PATH: &str = "./screenshots";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".launchpad.toml",
        ".launchpad.yaml",
    ]
}

/// Template written by `launchpad init`
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Launchpad configuration
#
# Command line flags override every value in this file.

# App Store Connect API key id; also used as the account when unset
# account = "ABC123DEFG"
# team_id = "118923741"

app_identifier = "com.example.app"
# apple_id = "1234567890"
# app_version = "1.0.0"
platform = "ios"

# Binary to upload, at most one of these
# ipa = "build/App.ipa"
# pkg = "build/App.pkg"

metadata_path = "./metadata"
screenshots_path = "./screenshots"

skip_binary_upload = false
force = false
submit_for_review = false

# price_tier = "eyJzIjoiMTAifQ"
# app_icon = "assets/icon-1024.png"
# staging_dir = "build/itmsp"

[api_key]
# key_id = "ABC123DEFG"
# issuer_id = "00000000-0000-0000-0000-000000000000"
# key_path = "~/.appstoreconnect/AuthKey_ABC123DEFG.p8"
"#;

/// Locale written by `launchpad init`
pub const DEFAULT_LOCALE: &str = "en-US";

/// Text files created for the template locale
pub const LOCALE_TEMPLATE_FILES: &[&str] = &[
    "name.txt",
    "subtitle.txt",
    "description.txt",
    "keywords.txt",
    "release_notes.txt",
    "promotional_text.txt",
    "support_url.txt",
    "marketing_url.txt",
    "privacy_url.txt",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeliverConfig;

    #[test]
    fn test_template_parses_and_validates() {
        let config: DeliverConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        crate::config::validate_config(&config).unwrap();
        assert_eq!(config.app_identifier.as_deref(), Some("com.example.app"));
        assert!(config.ipa.is_none());
    }
}
