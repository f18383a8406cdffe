//! Binary upload through Apple's iTMSTransporter

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::error::{Result, StoreError};
use crate::traits::Transporter;
use crate::types::Session;

/// Runs `xcrun iTMSTransporter -m upload` with API key authentication.
///
/// iTMSTransporter looks the key up by id in `./private_keys`,
/// `~/private_keys`, `~/.private_keys` or `~/.appstoreconnect/private_keys`.
#[derive(Debug, Clone)]
pub struct ItunesTransporter {
    key_id: String,
    issuer_id: String,
    program: String,
}

impl ItunesTransporter {
    pub fn new(key_id: impl Into<String>, issuer_id: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            program: "xcrun".to_string(),
        }
    }

    /// Use a different launcher than `xcrun`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments passed to the launcher
    pub fn command_args(&self, package: &Path, provider: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "iTMSTransporter".to_string(),
            "-m".to_string(),
            "upload".to_string(),
            "-f".to_string(),
            package.display().to_string(),
            "-apiKey".to_string(),
            self.key_id.clone(),
            "-apiIssuer".to_string(),
            self.issuer_id.clone(),
        ];
        if let Some(provider) = provider {
            args.push("-asc_provider".to_string());
            args.push(provider.to_string());
        }
        args
    }
}

/// Lines iTMSTransporter uses to report rejected uploads.
///
/// The tool can exit 0 while still printing these.
pub fn transporter_errors(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("ERROR ITMS-"))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Transporter for ItunesTransporter {
    #[instrument(skip(self, session))]
    async fn upload(&self, session: &Session, app_id: &str, package: &Path) -> Result<()> {
        let program = which::which(&self.program)
            .map_err(|_| StoreError::ToolNotFound(self.program.clone()))?;

        info!("Uploading {} for app {} via iTMSTransporter", package.display(), app_id);

        let output = Command::new(program)
            .args(self.command_args(package, session.context()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| StoreError::CommandFailed(format!("iTMSTransporter failed to start: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        debug!("iTMSTransporter stdout: {}", stdout);
        if !stderr.is_empty() {
            debug!("iTMSTransporter stderr: {}", stderr);
        }

        let mut errors = transporter_errors(&stdout);
        errors.extend(transporter_errors(&stderr));

        if !output.status.success() || !errors.is_empty() {
            let detail = if errors.is_empty() {
                stderr.trim().to_string()
            } else {
                errors.join("; ")
            };
            return Err(StoreError::UploadFailed(format!(
                "iTMSTransporter exited with {}: {}",
                output.status, detail
            )));
        }

        info!("Binary upload accepted for app {}", app_id);
        Ok(())
    }
}
