//! Validate command

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use launchpad_core::config::load_config_or_default;
use launchpad_core::LaunchpadError;
use launchpad_metadata::{BundleValidator, FilesystemSource, MetadataSource, StoreValidator};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Validate local metadata without contacting the store
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Directory with per-locale metadata text files
    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    /// Directory with per-locale screenshot folders
    #[arg(long)]
    pub screenshots_path: Option<PathBuf>,

    /// Strict mode - treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Metadata did not pass validation
#[derive(Debug, thiserror::Error)]
#[error("metadata validation failed with {0} error(s)")]
pub struct ValidationFailed(pub usize);

impl ValidateCommand {
    /// Execute the validate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(strict = self.strict, "executing validate command");
        let cwd = std::env::current_dir()?;

        let (mut config, _) = load_config_or_default(&cwd)?;
        if let Some(path) = &self.metadata_path {
            config.metadata_path.clone_from(path);
        }
        if let Some(path) = &self.screenshots_path {
            config.screenshots_path.clone_from(path);
        }
        let location = config.metadata_location();

        let runtime = tokio::runtime::Runtime::new()?;
        let bundle = runtime
            .block_on(FilesystemSource::new().load(&location))
            .map_err(LaunchpadError::from)?;
        let result = StoreValidator::new(self.strict).validate(&bundle);

        if cli.format == OutputFormat::Json {
            let to_strings = |issues: Vec<&launchpad_metadata::ValidationIssue>| {
                issues.iter().map(|i| i.to_string()).collect::<Vec<_>>()
            };
            let body = serde_json::json!({
                "valid": result.is_valid(),
                "locales": bundle.localizations.len(),
                "screenshots": bundle.screenshots.len(),
                "errors": to_strings(result.errors()),
                "warnings": to_strings(result.warnings()),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else if !cli.quiet {
            println!("{}", output::header("Metadata validation"));
            println!(
                "{}",
                output::key_value(
                    "Metadata",
                    &output::path_style()
                        .apply_to(location.metadata_path.display())
                        .to_string()
                )
            );
            println!(
                "{}",
                output::key_value(
                    "Found",
                    &format!(
                        "{} locale(s), {} screenshot(s)",
                        bundle.localizations.len(),
                        bundle.screenshots.len()
                    )
                )
            );
            println!();

            for issue in result.errors() {
                output::error(&issue.to_string());
            }
            for issue in result.warnings() {
                output::warning(&issue.to_string());
            }

            if result.is_valid() {
                println!();
                output::success(&format!(
                    "Metadata is valid {}",
                    style(format!("({} warning(s))", result.warning_count())).dim()
                ));
            }
        }

        if !result.is_valid() {
            return Err(ValidationFailed(result.error_count()).into());
        }
        Ok(())
    }
}
