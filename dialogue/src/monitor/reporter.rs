use tracing::{debug, info, warn};

use super::stage::PipelineStatus;
use super::tracker::PipelineSummary;

/// Sink for finished pipeline summaries. Called once per request, on the request path.
pub trait PipelineReporter: Send + Sync {
    fn report(&self, summary: PipelineSummary);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPipelineReporter;

impl PipelineReporter for LoggingPipelineReporter {
    fn report(&self, summary: PipelineSummary) {
        info!(
            pipeline_id = %summary.pipeline_id,
            status = summary.status.as_str(),
            total_ms = summary.total_duration_ms,
            first_response_ms = ?summary.first_response_latency_ms,
            last_response_ms = ?summary.last_response_latency_ms,
            outputs = summary.llm_outputs.len(),
            "Dialogue pipeline finished"
        );
        for stage in &summary.stages {
            debug!(
                pipeline_id = %summary.pipeline_id,
                stage = stage.stage.as_str(),
                status = ?stage.status,
                duration_ms = stage.duration_ms,
                attributes = ?stage.attributes,
                "Pipeline stage"
            );
        }
        if summary.status != PipelineStatus::Completed {
            warn!(
                pipeline_id = %summary.pipeline_id,
                status = summary.status.as_str(),
                error = ?summary.attributes.get("error"),
                attributes = ?summary.attributes,
                "Dialogue pipeline did not complete"
            );
        }
    }
}
