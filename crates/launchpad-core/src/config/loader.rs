//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::DeliverConfig;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<DeliverConfig> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: DeliverConfig = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// At each directory level the search checks:
///   1. `<dir>/<name>`          (e.g. `launchpad.toml`)
///   2. `<dir>/.github/<name>`  (e.g. `.github/launchpad.toml`)
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }

            let github_path = current.join(".github").join(name);
            if github_path.exists() {
                info!(path = %github_path.display(), "found config file in .github/");
                return Some(github_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(DeliverConfig, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration, falling back to defaults only when no file exists.
///
/// A file that exists but does not parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<(DeliverConfig, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => Ok((load_config(&path)?, Some(path))),
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((DeliverConfig::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchpadError;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("launchpad.toml");
        std::fs::write(&config_path, "app_identifier = \"com.example.rocket\"").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("launchpad.toml");
        let yaml_path = temp.path().join("launchpad.yaml");
        std::fs::write(&toml_path, "force = true").unwrap();
        std::fs::write(&yaml_path, "force: true").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), toml_path);
    }

    #[test]
    fn test_find_config_in_github_dir() {
        let temp = TempDir::new().unwrap();
        let github_dir = temp.path().join(".github");
        std::fs::create_dir_all(&github_dir).unwrap();
        let config_path = github_dir.join("launchpad.toml");
        std::fs::write(&config_path, "force = true").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".launchpad.yaml");
        std::fs::write(&config_path, "force: true").unwrap();
        let nested = temp.path().join("ios/App");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("launchpad.toml");
        std::fs::write(
            &config_path,
            "app_identifier = \"com.example.rocket\"\napp_version = \"2.0\"\nipa = \"build/Rocket.ipa\"\n\n[api_key]\nkey_id = \"KEY123\"\nissuer_id = \"issuer\"\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.app_version.as_deref(), Some("2.0"));
        assert_eq!(config.api_key.key_id.as_deref(), Some("KEY123"));
        assert_eq!(config.metadata_path, PathBuf::from("./metadata"));
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("launchpad.yaml");
        std::fs::write(
            &config_path,
            "app_identifier: com.example.rocket\nplatform: osx\npkg: build/Rocket.pkg\nsubmit_for_review: true\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.platform.as_deref(), Some("osx"));
        assert!(config.submit_for_review);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("launchpad.toml");
        std::fs::write(&config_path, "ipa = \"a.ipa\"\npkg = \"a.pkg\"\n").unwrap();

        assert!(matches!(
            load_config(&config_path),
            Err(LaunchpadError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, DeliverConfig::default());
    }
}
