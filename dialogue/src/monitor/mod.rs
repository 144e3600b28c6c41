//! Per-request pipeline observability: stage timing, attributes and a one-shot summary.

mod reporter;
mod stage;
mod tracker;

pub use reporter::{LoggingPipelineReporter, PipelineReporter};
pub use stage::{PipelineStage, PipelineStatus, StageStatus};
pub use tracker::{DialoguePipelineTracker, PipelineSummary, StageGuard, StageSnapshot};

use std::sync::Arc;

use dialogue_core::Clock;

/// Creates one tracker per request, all reporting to the same sink.
#[derive(Clone)]
pub struct DialoguePipelineMonitor {
    reporter: Arc<dyn PipelineReporter>,
    clock: Arc<dyn Clock>,
}

impl DialoguePipelineMonitor {
    pub fn new(reporter: Arc<dyn PipelineReporter>, clock: Arc<dyn Clock>) -> Self {
        Self { reporter, clock }
    }

    pub fn create(&self, input: &str) -> Arc<DialoguePipelineTracker> {
        Arc::new(DialoguePipelineTracker::new(
            input,
            Arc::clone(&self.reporter),
            Arc::clone(&self.clock),
        ))
    }
}
