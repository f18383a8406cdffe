//! Output formatting utilities

use std::sync::Mutex;
use std::time::Duration;

use console::{style, Style};
use indicatif::{ProgressBar, ProgressStyle};
use launchpad_core::{PipelineEvent, PipelineReporter, RunPhase, Stage};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for version numbers
pub fn version_style() -> Style {
    Style::new().green().bold()
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Prints one line per stage, with a spinner while a stage runs
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(&self, stage: Stage) {
        // Validation may prompt, a spinner would draw over it
        if stage == Stage::Validate {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
        );
        pb.set_message(format!("{}...", stage));
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.lock() = Some(pb);
    }

    fn stop_spinner(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.spinner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PipelineReporter for ConsoleReporter {
    fn report(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage } => self.start_spinner(*stage),
            PipelineEvent::StageSucceeded {
                stage,
                duration,
                detail,
            } => {
                self.stop_spinner();
                let elapsed = style(format!("({:.1}s)", duration.as_secs_f64())).dim();
                match detail {
                    Some(detail) => success(&format!("{}: {} {}", stage, detail, elapsed)),
                    None => success(&format!("{} {}", stage, elapsed)),
                }
            }
            PipelineEvent::StageFailed { stage, error: e, .. } => {
                self.stop_spinner();
                error(&format!("{}: {}", stage, e));
            }
            PipelineEvent::StageSkipped { stage, reason } => {
                println!(
                    "{} {}",
                    style("-").dim(),
                    style(format!("{} skipped ({})", stage, reason)).dim()
                );
            }
            PipelineEvent::VersionReconciled { version, created } => {
                let version = version_style().apply_to(version);
                if *created {
                    info(&format!("Store version {} prepared", version));
                } else {
                    info(&format!("Store version {} already in place", version));
                }
            }
            PipelineEvent::Finished { phase } => {
                self.stop_spinner();
                if let RunPhase::Failed(stage) = phase {
                    warning(&format!("Delivery stopped at {}", stage));
                }
            }
        }
    }
}
