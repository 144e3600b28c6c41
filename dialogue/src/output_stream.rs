//! The stream handed to the caller. It owns the request's lifecycle: the tracker is finished
//! exactly once, as COMPLETED at the end, FAILED on the first error or CANCELLED when dropped early.

use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dialogue_core::DialogueError;
use futures::stream::{BoxStream, Stream, StreamExt};

use crate::monitor::{DialoguePipelineTracker, PipelineStage, PipelineStatus};

/// Runs once after the stream completed successfully.
pub(crate) type CompletionHook = Box<dyn FnOnce() + Send>;

/// Stage covering the emitted items, and the counter incremented per item.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputStage {
    pub stage: PipelineStage,
    pub counter: &'static str,
}

pub(crate) struct PipelineStream<T> {
    inner: BoxStream<'static, Result<T, DialogueError>>,
    tracker: Arc<DialoguePipelineTracker>,
    output_stage: Option<OutputStage>,
    on_complete: Option<CompletionHook>,
    done: bool,
}

impl<T> PipelineStream<T> {
    pub(crate) fn new(
        inner: BoxStream<'static, Result<T, DialogueError>>,
        tracker: Arc<DialoguePipelineTracker>,
        output_stage: Option<OutputStage>,
        on_complete: CompletionHook,
    ) -> Self {
        Self {
            inner,
            tracker,
            output_stage,
            on_complete: Some(on_complete),
            done: false,
        }
    }
}

impl<T> Stream for PipelineStream<T> {
    type Item = Result<T, DialogueError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(item))) => {
                this.tracker.mark_response_emission();
                if let Some(output) = this.output_stage {
                    this.tracker.increment_stage_counter(output.stage, output.counter, 1);
                }
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(Some(Err(error))) => {
                this.done = true;
                if let (Some(output), DialogueError::Tts(_)) = (this.output_stage, &error) {
                    this.tracker.fail_stage(output.stage, &error);
                }
                this.tracker
                    .finish(PipelineStatus::Failed, Some(&error as &dyn Display));
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.done = true;
                if let Some(output) = this.output_stage {
                    this.tracker.complete_stage(output.stage);
                }
                if this.tracker.finish(PipelineStatus::Completed, None) {
                    if let Some(hook) = this.on_complete.take() {
                        hook();
                    }
                }
                Poll::Ready(None)
            }
        }
    }
}

impl<T> Drop for PipelineStream<T> {
    fn drop(&mut self) {
        if !self.done {
            self.tracker.finish(PipelineStatus::Cancelled, None);
        }
    }
}
