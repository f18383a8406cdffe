//! Deliver command

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use dialoguer::Confirm;
use tracing::info;

use launchpad_core::config::{load_config_or_default, validate_config, DeliverConfig};
use launchpad_core::{
    Collaborators, ConfigError, DeliverPipeline, LaunchpadError, PipelineError, PipelineFailure,
    ReleaseRequest, ReporterRegistry, RunReport, Stage,
};
use launchpad_metadata::{
    BundleValidator, FilesystemSource, MetadataBundle, StoreValidator, ValidationIssue,
    ValidationResult,
};
use launchpad_stores::apple::{
    AppStoreConnectConfig, ConnectAssetUploader, ConnectClient, ConnectListingUploader,
    ConnectPriceTierUploader, ConnectRemoteApp, ConnectReviewSubmitter, ConnectScreenshotUploader,
    ConnectSessionProvider, IpaInspector, IpaPackageBuilder, ItunesTransporter, PkgPackageBuilder,
};

use crate::cli::output::{self, ConsoleReporter};
use crate::cli::{Cli, OutputFormat};

/// Upload metadata, screenshots and a build, then optionally submit for review
#[derive(Debug, Args)]
pub struct DeliverCommand {
    /// Account to log in with (defaults to the API key id)
    #[arg(long)]
    pub account: Option<String>,

    /// Team / provider id
    #[arg(long)]
    pub team_id: Option<String>,

    /// Bundle identifier of the app
    #[arg(short = 'a', long)]
    pub app_identifier: Option<String>,

    /// Numeric App Store Connect id of the app
    #[arg(long)]
    pub apple_id: Option<String>,

    /// Version the store should end up with
    #[arg(long)]
    pub app_version: Option<String>,

    /// Target platform (ios, osx, appletvos)
    #[arg(long)]
    pub platform: Option<String>,

    /// Path to the .ipa to upload
    #[arg(long, conflicts_with = "pkg")]
    pub ipa: Option<PathBuf>,

    /// Path to the .pkg to upload
    #[arg(long)]
    pub pkg: Option<PathBuf>,

    /// Directory with per-locale metadata text files
    #[arg(long)]
    pub metadata_path: Option<PathBuf>,

    /// Directory with per-locale screenshot folders
    #[arg(long)]
    pub screenshots_path: Option<PathBuf>,

    /// App Store Connect price point id
    #[arg(long)]
    pub price_tier: Option<String>,

    /// Where transport packages are built (default: a temporary directory)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Do not upload the binary even if one is configured
    #[arg(long)]
    pub skip_binary_upload: bool,

    /// Skip metadata validation
    #[arg(long)]
    pub force: bool,

    /// Submit the version for review once everything is uploaded
    #[arg(long)]
    pub submit_for_review: bool,

    /// Do not ask for confirmation before uploading
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// App Store Connect API key id
    #[arg(long, env = "APP_STORE_CONNECT_API_KEY_ID")]
    pub api_key_id: Option<String>,

    /// App Store Connect API issuer id
    #[arg(long, env = "APP_STORE_CONNECT_API_ISSUER_ID")]
    pub api_issuer_id: Option<String>,

    /// Path to the App Store Connect .p8 key
    #[arg(long, env = "APP_STORE_CONNECT_API_KEY_PATH")]
    pub api_key_path: Option<PathBuf>,
}

fn override_with<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// Store rules, then a confirmation of what is about to be uploaded
struct ConfirmingValidator {
    inner: StoreValidator,
    confirm: bool,
}

impl BundleValidator for ConfirmingValidator {
    fn validate(&self, bundle: &MetadataBundle) -> ValidationResult {
        let mut result = self.inner.validate(bundle);
        if !self.confirm || !result.is_valid() {
            return result;
        }

        let prompt = format!(
            "Upload metadata for {} locale(s) and {} screenshot(s)?",
            bundle.localizations.len(),
            bundle.screenshots.len()
        );
        let confirmed = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            result.add(ValidationIssue::error("preview", "upload was not confirmed"));
        }
        result
    }
}

impl DeliverCommand {
    /// Execute the deliver command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            force = self.force,
            skip_binary_upload = self.skip_binary_upload,
            submit_for_review = self.submit_for_review,
            "executing deliver command"
        );
        let cwd = std::env::current_dir()?;

        let (mut config, config_path) = load_config_or_default(&cwd)?;
        if let Some(path) = &config_path {
            info!(path = %path.display(), "using config file");
        }
        self.apply_overrides(&mut config);
        validate_config(&config)?;

        let api_key = Self::api_key(&config).map_err(LaunchpadError::from)?;
        let request = config.into_request()?;

        if cli.prints_text() {
            print_summary(&request);
        }

        let mut reporters = ReporterRegistry::new();
        if cli.prints_text() {
            reporters.register(ConsoleReporter::new());
        }
        let confirm = !self.yes && console::user_attended();
        let pipeline = DeliverPipeline::new(collaborators(api_key, &request, confirm))
            .with_reporters(reporters);

        let runtime = tokio::runtime::Runtime::new()?;
        match runtime.block_on(pipeline.execute(&request)) {
            Ok(report) => {
                print_report(&report, cli)?;
                Ok(())
            }
            Err(failure) => {
                print_failure(&failure, cli)?;
                Err(LaunchpadError::Pipeline(failure).into())
            }
        }
    }

    /// Command line values win over the config file
    fn apply_overrides(&self, config: &mut DeliverConfig) {
        override_with(&mut config.account, &self.account);
        override_with(&mut config.team_id, &self.team_id);
        override_with(&mut config.app_identifier, &self.app_identifier);
        override_with(&mut config.apple_id, &self.apple_id);
        override_with(&mut config.app_version, &self.app_version);
        override_with(&mut config.platform, &self.platform);
        override_with(&mut config.price_tier, &self.price_tier);
        override_with(&mut config.staging_dir, &self.staging_dir);
        override_with(&mut config.api_key.key_id, &self.api_key_id);
        override_with(&mut config.api_key.issuer_id, &self.api_issuer_id);
        override_with(&mut config.api_key.key_path, &self.api_key_path);

        // An artifact on the command line replaces either kind from the file
        if self.ipa.is_some() {
            config.ipa.clone_from(&self.ipa);
            config.pkg = None;
        } else if self.pkg.is_some() {
            config.pkg.clone_from(&self.pkg);
            config.ipa = None;
        }

        if let Some(path) = &self.metadata_path {
            config.metadata_path.clone_from(path);
        }
        if let Some(path) = &self.screenshots_path {
            config.screenshots_path.clone_from(path);
        }

        config.skip_binary_upload |= self.skip_binary_upload;
        config.force |= self.force;
        config.submit_for_review |= self.submit_for_review;
    }

    fn api_key(config: &DeliverConfig) -> Result<AppStoreConnectConfig, ConfigError> {
        let missing = |field: &str| ConfigError::MissingField(format!("api_key.{}", field));
        let key = &config.api_key;
        let key_id = key.key_id.clone().ok_or_else(|| missing("key_id"))?;
        let issuer_id = key.issuer_id.clone().ok_or_else(|| missing("issuer_id"))?;
        let key_path = key.key_path.as_ref().ok_or_else(|| missing("key_path"))?;
        Ok(AppStoreConnectConfig::new(
            key_id,
            issuer_id,
            key_path.display().to_string(),
        ))
    }
}

/// Wire the App Store Connect implementations into the pipeline
fn collaborators(api_key: AppStoreConnectConfig, request: &ReleaseRequest, confirm: bool) -> Collaborators {
    let transporter = ItunesTransporter::new(api_key.key_id.clone(), api_key.issuer_id.clone());
    let client = Arc::new(ConnectClient::new(api_key));

    Collaborators {
        sessions: Arc::new(ConnectSessionProvider::new(client.clone())),
        inspector: Arc::new(IpaInspector::new()),
        remote_app: Arc::new(ConnectRemoteApp::new(client.clone())),
        metadata_source: Arc::new(FilesystemSource::new()),
        validator: Arc::new(ConfirmingValidator {
            inner: StoreValidator::new(false),
            confirm,
        }),
        metadata: Arc::new(ConnectListingUploader::new(client.clone())),
        screenshots: Arc::new(ConnectScreenshotUploader::new(client.clone())),
        pricing: Arc::new(ConnectPriceTierUploader::new(client.clone())),
        assets: Arc::new(ConnectAssetUploader::new()),
        ipa_builder: Arc::new(IpaPackageBuilder::new(request.platform.unwrap_or_default())),
        pkg_builder: Arc::new(PkgPackageBuilder::new()),
        transporter: Arc::new(transporter),
        submission: Arc::new(ConnectReviewSubmitter::new(client)),
    }
}

fn print_summary(request: &ReleaseRequest) {
    let app = match (&request.app.bundle_id, &request.app.apple_id) {
        (Some(bundle_id), Some(apple_id)) => format!("{} ({})", bundle_id, apple_id),
        (Some(bundle_id), None) => bundle_id.clone(),
        (None, Some(apple_id)) => apple_id.clone(),
        (None, None) => "from binary".to_string(),
    };
    let platform = request
        .platform
        .map(|p| p.to_string())
        .unwrap_or_else(|| "auto".to_string());
    let mut flags = Vec::new();
    if request.skip_binary_upload {
        flags.push("skip binary upload");
    }
    if request.force {
        flags.push("force");
    }
    if request.submit_for_review {
        flags.push("submit for review");
    }

    println!("{}", output::header("Delivery"));
    println!("{}", output::key_value("Account", &request.account));
    if let Some(team) = &request.team_id {
        println!("{}", output::key_value("Team", team));
    }
    println!("{}", output::key_value("App", &app));
    println!(
        "{}",
        output::key_value("Version", request.target_version().unwrap_or("unchanged"))
    );
    println!("{}", output::key_value("Platform", &platform));
    println!("{}", output::key_value("Binary", &request.artifact.to_string()));
    println!(
        "{}",
        output::key_value(
            "Metadata",
            &output::path_style()
                .apply_to(request.metadata.metadata_path.display())
                .to_string()
        )
    );
    println!(
        "{}",
        output::key_value(
            "Screenshots",
            &output::path_style()
                .apply_to(request.metadata.screenshots_path.display())
                .to_string()
        )
    );
    if !flags.is_empty() {
        println!("{}", output::key_value("Flags", &flags.join(", ")));
    }
    println!();
}

fn print_report(report: &RunReport, cli: &Cli) -> anyhow::Result<()> {
    if cli.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    println!();
    match &report.app {
        Some(app) => output::success(&format!("Delivered {}", app)),
        None => output::success("Delivery complete"),
    }
    let version = match &report.version {
        Some(v) if v.created => format!("{} (prepared in the store)", v.version),
        Some(v) => format!("{} (already in place)", v.version),
        None => "not changed".to_string(),
    };
    println!("{}", output::key_value("Version", &version));
    println!(
        "{}",
        output::key_value(
            "Binary",
            if report.binary_uploaded { "uploaded" } else { "not uploaded" }
        )
    );
    println!(
        "{}",
        output::key_value(
            "Review",
            if report.submitted { "submitted" } else { "not submitted" }
        )
    );
    Ok(())
}

fn print_failure(failure: &PipelineFailure, cli: &Cli) -> anyhow::Result<()> {
    let issues: Vec<String> = match &failure.error {
        PipelineError::Validation { issues } => issues.iter().map(ToString::to_string).collect(),
        _ => Vec::new(),
    };

    if cli.format == OutputFormat::Json {
        let body = serde_json::json!({
            "failed_stage": failure.stage,
            "commit": failure.commit,
            "error": failure.error.to_string(),
            "issues": issues,
            "report": failure.report,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    println!();
    for issue in &issues {
        output::error(issue);
    }
    if failure.nothing_committed() {
        output::info("Nothing was changed in App Store Connect");
    } else {
        output::warning(&format!("{}", failure.commit));
    }
    if failure.stage == Stage::Submission {
        output::info("Re-run with only --submit-for-review once the issue is fixed");
    }
    println!("  {}", style(format!("Failed at: {}", failure.stage)).dim());
    Ok(())
}
