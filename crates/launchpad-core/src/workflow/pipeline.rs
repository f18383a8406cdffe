//! The delivery pipeline
//!
//! Stages run strictly in sequence:
//!
//! ```text
//! authenticate → resolve → reconcile version → load metadata → validate
//!   → metadata → screenshots → price tier → assets → binary → submission
//! ```
//!
//! The first failing stage ends the run. Nothing is retried or rolled back;
//! the failure carries the stage, the cause and what is already committed
//! in the store so the caller can decide how to resume.

use launchpad_metadata::{BundleValidator, MetadataSource};
use launchpad_stores::{
    ArtifactInspector, MetadataStageExecutor, PackageBuilder, RemoteApp, SessionProvider,
    StageEffect, StoreError, SubmissionService, Transporter,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::detect::detect;
use super::events::{PipelineEvent, ReporterRegistry};
use super::report::{CommitState, RunPhase, RunReport, VersionOutcome};
use super::stage::{Stage, StageResult};
use crate::error::{PipelineError, PipelineFailure};
use crate::types::{BinaryArtifact, ReleaseRequest};

/// Everything the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionProvider>,
    pub inspector: Arc<dyn ArtifactInspector>,
    pub remote_app: Arc<dyn RemoteApp>,
    pub metadata_source: Arc<dyn MetadataSource>,
    pub validator: Arc<dyn BundleValidator>,
    pub metadata: Arc<dyn MetadataStageExecutor>,
    pub screenshots: Arc<dyn MetadataStageExecutor>,
    pub pricing: Arc<dyn MetadataStageExecutor>,
    pub assets: Arc<dyn MetadataStageExecutor>,
    pub ipa_builder: Arc<dyn PackageBuilder>,
    pub pkg_builder: Arc<dyn PackageBuilder>,
    pub transporter: Arc<dyn Transporter>,
    pub submission: Arc<dyn SubmissionService>,
}

type StageOutcome<T> = std::result::Result<T, (Stage, PipelineError)>;

/// Mutable state of one run
struct Run<'a> {
    report: RunReport,
    reporters: &'a ReporterRegistry,
}

impl Run<'_> {
    /// Run `work` as `stage`, recording and broadcasting its outcome
    async fn stage<T, Fut, D>(&mut self, stage: Stage, work: Fut, detail: D) -> StageOutcome<T>
    where
        Fut: Future<Output = Result<T, PipelineError>>,
        D: FnOnce(&T) -> Option<String>,
    {
        self.reporters.broadcast(&PipelineEvent::StageStarted { stage });
        let started = Instant::now();
        let outcome = work.await;
        let duration = started.elapsed();
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(value) => {
                let detail = detail(&value);
                self.report
                    .record(StageResult::completed(stage, duration_ms, detail.clone()));
                self.reporters.broadcast(&PipelineEvent::StageSucceeded {
                    stage,
                    duration,
                    detail,
                });
                Ok(value)
            }
            Err(error) => {
                let message = error.to_string();
                self.report
                    .record(StageResult::failed(stage, duration_ms, message.clone()));
                self.reporters.broadcast(&PipelineEvent::StageFailed {
                    stage,
                    duration,
                    error: message,
                });
                Err((stage, error))
            }
        }
    }

    fn skip(&mut self, stage: Stage, reason: &str) {
        self.report.record(StageResult::skipped(stage, reason));
        self.reporters.broadcast(&PipelineEvent::StageSkipped {
            stage,
            reason: reason.to_string(),
        });
    }

    fn advance(&mut self, phase: RunPhase) {
        debug!(from = ?self.report.phase, to = ?phase, "run phase");
        self.report.phase = phase;
    }
}

/// Sequences a delivery against its collaborators
pub struct DeliverPipeline {
    collaborators: Collaborators,
    reporters: ReporterRegistry,
}

impl DeliverPipeline {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            reporters: ReporterRegistry::new(),
        }
    }

    pub fn with_reporters(mut self, reporters: ReporterRegistry) -> Self {
        self.reporters = reporters;
        self
    }

    /// Run the whole delivery for `request`.
    ///
    /// Succeeds only if every unconditional stage and every enabled
    /// conditional stage succeeded.
    #[instrument(skip_all, fields(account = %request.account))]
    pub async fn execute(&self, request: &ReleaseRequest) -> Result<RunReport, Box<PipelineFailure>> {
        info!(
            artifact = %request.artifact,
            version = ?request.target_version(),
            force = request.force,
            skip_binary_upload = request.skip_binary_upload,
            submit_for_review = request.submit_for_review,
            "starting delivery"
        );

        let mut run = Run {
            report: RunReport::new(),
            reporters: &self.reporters,
        };

        let outcome = self.drive(request, &mut run).await;
        match outcome {
            Ok(()) => {
                run.advance(RunPhase::Done);
                self.reporters
                    .broadcast(&PipelineEvent::Finished { phase: RunPhase::Done });
                Ok(run.report)
            }
            Err((stage, error)) => {
                run.advance(RunPhase::Failed(stage));
                let commit = CommitState::after_failure(&run.report, stage);
                warn!(stage = ?stage, commit = %commit, "delivery failed");
                self.reporters.broadcast(&PipelineEvent::Finished {
                    phase: RunPhase::Failed(stage),
                });
                Err(Box::new(PipelineFailure {
                    stage,
                    error,
                    commit,
                    report: run.report,
                }))
            }
        }
    }

    async fn drive(&self, request: &ReleaseRequest, run: &mut Run<'_>) -> StageOutcome<()> {
        let c = &self.collaborators;

        let session = run
            .stage(
                Stage::Authenticate,
                async {
                    let auth_error = |source| PipelineError::Authentication {
                        account: request.account.clone(),
                        source,
                    };
                    let mut session = c.sessions.login(&request.account).await.map_err(auth_error)?;
                    c.sessions
                        .select_context(&mut session, request.team_id.as_deref())
                        .await
                        .map_err(auth_error)?;
                    Ok::<_, PipelineError>(session)
                },
                |session| session.context().map(|team| format!("team {}", team)),
            )
            .await?;
        run.advance(RunPhase::Authenticated);

        let (app, platform) = run
            .stage(
                Stage::Resolve,
                async {
                    let detection = detect(request, c.inspector.as_ref()).await?;
                    let app = c
                        .remote_app
                        .resolve_identity(&session, &detection.reference)
                        .await
                        .map_err(|source| PipelineError::Resolution {
                            reason: "app lookup failed".to_string(),
                            source: Some(source),
                        })?;
                    Ok::<_, PipelineError>((app, detection.platform))
                },
                |(app, platform)| Some(format!("{} on {}", app, platform)),
            )
            .await?;
        run.report.app = Some(app.clone());
        run.advance(RunPhase::Resolved);

        match request.target_version() {
            Some(version) => {
                let reconciled = run
                    .stage(
                        Stage::ReconcileVersion,
                        async {
                            c.remote_app
                                .reconcile_version(&session, &app, platform, version)
                                .await
                                .map_err(|source| PipelineError::Reconciliation {
                                    version: version.to_string(),
                                    source,
                                })
                        },
                        |r| Some(if r.created { "created" } else { "already matched" }.to_string()),
                    )
                    .await?;
                run.report.version = Some(VersionOutcome {
                    version: version.to_string(),
                    created: reconciled.created,
                });
                run.reporters.broadcast(&PipelineEvent::VersionReconciled {
                    version: version.to_string(),
                    created: reconciled.created,
                });
            }
            None => run.skip(Stage::ReconcileVersion, "no target version"),
        }
        run.advance(RunPhase::VersionChecked);

        // The bundle lives only as long as the metadata-class stages
        {
            let bundle = run
                .stage(
                    Stage::LoadMetadata,
                    async {
                        c.metadata_source
                            .load(&request.metadata)
                            .await
                            .map_err(PipelineError::MetadataLoad)
                    },
                    |b| {
                        Some(format!(
                            "{} locale(s), {} screenshot(s)",
                            b.localizations.len(),
                            b.screenshots.len()
                        ))
                    },
                )
                .await?;

            if request.force {
                run.skip(Stage::Validate, "force is set");
            } else {
                run.stage(
                    Stage::Validate,
                    async {
                        let result = c.validator.validate(&bundle);
                        for issue in result.warnings() {
                            warn!("{}", issue);
                        }
                        if result.is_valid() {
                            Ok(result.warning_count())
                        } else {
                            Err(PipelineError::Validation {
                                issues: result.errors().into_iter().cloned().collect(),
                            })
                        }
                    },
                    |warnings| (*warnings > 0).then(|| format!("{} warning(s)", warnings)),
                )
                .await?;
            }

            let executors = [&c.metadata, &c.screenshots, &c.pricing, &c.assets];
            for (stage, executor) in Stage::METADATA_UPLOADS.into_iter().zip(executors) {
                let effect = run
                    .stage(
                        stage,
                        async {
                            executor
                                .run(&session, &app, platform, &bundle)
                                .await
                                .map_err(|source| PipelineError::Remote { stage, source })
                        },
                        |effect| {
                            (*effect == StageEffect::Unchanged).then(|| "store unchanged".to_string())
                        },
                    )
                    .await?;
                if effect == StageEffect::Unchanged {
                    run.report.mark_unchanged(stage);
                }
            }
        }
        run.advance(RunPhase::MetadataCommitted);

        let binary = match &request.artifact {
            _ if request.skip_binary_upload => None,
            BinaryArtifact::None => None,
            BinaryArtifact::Ipa(path) => Some((c.ipa_builder.as_ref(), path.as_path())),
            BinaryArtifact::Pkg(path) => Some((c.pkg_builder.as_ref(), path.as_path())),
        };
        match binary {
            Some((builder, artifact)) => {
                run.stage(
                    Stage::BinaryUpload,
                    self.upload_binary(request, builder, artifact, &session, &app.apple_id),
                    |package| Some(package.clone()),
                )
                .await?;
                run.report.binary_uploaded = true;
                run.advance(RunPhase::BinaryCommitted);
            }
            None if request.skip_binary_upload => {
                run.skip(Stage::BinaryUpload, "skip_binary_upload is set")
            }
            None => run.skip(Stage::BinaryUpload, "no binary artifact"),
        }

        if request.submit_for_review {
            run.stage(
                Stage::Submission,
                async {
                    c.submission
                        .submit(&session, &app, platform)
                        .await
                        .map_err(|source| PipelineError::Remote {
                            stage: Stage::Submission,
                            source,
                        })
                },
                |_| None,
            )
            .await?;
            run.report.submitted = true;
            run.advance(RunPhase::Submitted);
        } else {
            run.skip(Stage::Submission, "submit_for_review is not set");
        }

        Ok(())
    }

    /// Build the transport package and hand it to the transporter.
    ///
    /// Returns the package path for the report.
    async fn upload_binary(
        &self,
        request: &ReleaseRequest,
        builder: &dyn PackageBuilder,
        artifact: &Path,
        session: &launchpad_stores::Session,
        app_id: &str,
    ) -> Result<String, PipelineError> {
        let remote = |source| PipelineError::Remote {
            stage: Stage::BinaryUpload,
            source,
        };

        // Held until the upload finishes; removed on drop
        let temp_dir;
        let staging_dir = match &request.staging_dir {
            Some(dir) => dir.as_path(),
            None => {
                temp_dir = tempfile::TempDir::new().map_err(|e| remote(StoreError::Io(e)))?;
                temp_dir.path()
            }
        };

        let package = builder
            .generate(app_id, artifact, staging_dir)
            .await
            .map_err(remote)?;
        self.collaborators
            .transporter
            .upload(session, app_id, &package)
            .await
            .map_err(remote)?;

        Ok(package.display().to_string())
    }
}
