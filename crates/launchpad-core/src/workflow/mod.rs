//! Delivery workflow: stages, run reporting and the pipeline itself

mod detect;
mod events;
mod pipeline;
mod report;
mod stage;

pub use detect::{detect, Detection};
pub use events::{
    CollectingReporter, PipelineEvent, PipelineReporter, ReporterRegistry, TracingReporter,
};
pub use pipeline::{Collaborators, DeliverPipeline};
pub use report::{CommitState, RunPhase, RunReport, VersionOutcome};
pub use stage::{Stage, StageResult, StageStatus};
