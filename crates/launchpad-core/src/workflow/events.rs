//! Pipeline progress reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::report::RunPhase;
use super::stage::Stage;

/// Events emitted while a delivery runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A stage is starting
    StageStarted { stage: Stage },
    /// A stage completed
    StageSucceeded {
        stage: Stage,
        duration: Duration,
        detail: Option<String>,
    },
    /// A stage failed; nothing after it runs
    StageFailed {
        stage: Stage,
        duration: Duration,
        error: String,
    },
    /// A stage was not needed for this request
    StageSkipped { stage: Stage, reason: String },
    /// The store version was checked against the target
    VersionReconciled { version: String, created: bool },
    /// The run reached a terminal phase
    Finished { phase: RunPhase },
}

/// Trait for reporting pipeline progress
pub trait PipelineReporter: Send + Sync {
    /// Handle a pipeline event
    fn report(&self, event: &PipelineEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => {
                tracing::info!(stage = ?stage, "starting {}", stage);
            }
            PipelineEvent::StageSucceeded {
                stage,
                duration,
                detail,
            } => match detail {
                Some(detail) => tracing::info!(
                    stage = ?stage,
                    "{} completed in {:.1}s ({})",
                    stage,
                    duration.as_secs_f64(),
                    detail
                ),
                None => tracing::info!(stage = ?stage, "{} completed in {:.1}s", stage, duration.as_secs_f64()),
            },
            PipelineEvent::StageFailed {
                stage,
                duration,
                error,
            } => {
                tracing::error!(
                    stage = ?stage,
                    "{} failed after {:.1}s: {}",
                    stage,
                    duration.as_secs_f64(),
                    error
                );
            }
            PipelineEvent::StageSkipped { stage, reason } => {
                tracing::info!(stage = ?stage, "{} skipped: {}", stage, reason);
            }
            PipelineEvent::VersionReconciled { version, created } => {
                if *created {
                    tracing::info!(version = %version, "store version {} created", version);
                } else {
                    tracing::info!(version = %version, "store version {} already in place", version);
                }
            }
            PipelineEvent::Finished { phase } => {
                tracing::info!(phase = ?phase, "delivery finished");
            }
        }
    }
}

/// Reporter that collects events for later inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Stages that emitted a start event, in order
    pub fn started_stages(&self) -> Vec<Stage> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl PipelineReporter for CollectingReporter {
    fn report(&self, event: &PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

impl<R: PipelineReporter + ?Sized> PipelineReporter for Arc<R> {
    fn report(&self, event: &PipelineEvent) {
        (**self).report(event);
    }
}

/// Registry of pipeline reporters
pub struct ReporterRegistry {
    reporters: Vec<Arc<dyn PipelineReporter>>,
}

impl ReporterRegistry {
    /// A registry with the tracing reporter already registered
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: PipelineReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Broadcast an event to all registered reporters
    pub fn broadcast(&self, event: &PipelineEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
