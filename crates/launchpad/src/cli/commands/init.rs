//! Init command

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use dialoguer::Confirm;
use tracing::info;

use launchpad_core::config::defaults::{
    DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML, DEFAULT_LOCALE, LOCALE_TEMPLATE_FILES,
};

use crate::cli::output;
use crate::cli::Cli;

/// Create a launchpad.toml and a metadata skeleton
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Use defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_TOML));

        if config_path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;
        let root = config_path.parent().unwrap_or(&cwd);
        let created = write_skeleton(root)?;

        if !cli.quiet {
            output::success(&format!(
                "Created {}",
                output::path_style().apply_to(config_path.display())
            ));
            for path in &created {
                println!(
                    "  {}",
                    output::path_style().apply_to(path.strip_prefix(root).unwrap_or(path).display())
                );
            }
            println!();
            output::info("Fill in the metadata files, then run `launchpad validate`");
        }

        Ok(())
    }
}

/// Create the metadata and screenshots layout for the template locale.
///
/// Existing files are left untouched. Returns what was created.
fn write_skeleton(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let metadata = root.join("metadata");
    let locale_dir = metadata.join(DEFAULT_LOCALE);
    let screenshots = root.join("screenshots").join(DEFAULT_LOCALE);
    std::fs::create_dir_all(&locale_dir)?;
    std::fs::create_dir_all(&screenshots)?;

    let files = LOCALE_TEMPLATE_FILES
        .iter()
        .map(|name| locale_dir.join(name))
        .chain(std::iter::once(metadata.join("copyright.txt")));

    let mut created = Vec::new();
    for path in files {
        if !path.exists() {
            std::fs::write(&path, "")?;
            created.push(path);
        }
    }
    Ok(created)
}
