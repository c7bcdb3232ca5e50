//! Orchestrator implementation.
//!
//! Spawns one summarization task per eligible entry, joins them as one
//! unit, and applies the produced summaries to the feed document. The
//! first task error or the external cancellation signal tears the whole
//! batch down.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::feed::FeedDocument;
use crate::pipeline::{EntryPipeline, PipelineError};
use crate::sync::{GroupOutcome, TaskGroup};

use super::types::RunOutcome;

/// Fixed marker under which a summary is appended to a description.
pub const DESCRIPTION_MARKER: &str = "\n\nLLM's result:\n";

/// Runs the per-entry pipelines over a parsed feed.
pub struct Orchestrator {
    config: Arc<RunConfig>,
    pipeline: Arc<EntryPipeline>,
}

impl Orchestrator {
    pub fn new(config: Arc<RunConfig>, pipeline: Arc<EntryPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Summarizes every eligible entry of `document` concurrently.
    ///
    /// Short-form entries are skipped unless configured otherwise. The
    /// run either completes with all descriptions rewritten, stops at
    /// the first entry error (siblings aborted, error propagated), or
    /// reports [`RunOutcome::Cancelled`] when `cancel` fires first; a
    /// cancelled run leaves the document unmodified.
    pub async fn run(
        &self,
        document: &mut FeedDocument,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        let mut group: TaskGroup<PipelineError> = TaskGroup::new(cancel);
        let summaries: Arc<Mutex<Vec<(usize, String)>>> = Arc::new(Mutex::new(Vec::new()));

        for (index, entry) in document.entries().iter().enumerate() {
            tracing::info!(link = entry.link.as_str(), "found feed entry");
            if !self.config.proceed_with_shorts && entry.link.contains("shorts") {
                tracing::info!(link = entry.link.as_str(), "short-form entry, skipping");
                continue;
            }

            let entry = entry.clone();
            let pipeline = Arc::clone(&self.pipeline);
            let summaries = Arc::clone(&summaries);
            group.spawn(async move {
                let summary = pipeline.summarize(&entry).await?;
                summaries.lock().await.push((index, summary));
                Ok(())
            });
        }

        tracing::info!(tasks = group.len(), "summarization tasks spawned");
        match group.join().await? {
            GroupOutcome::Cancelled => {
                tracing::info!("run cancelled before completion");
                return Ok(RunOutcome::Cancelled);
            }
            GroupOutcome::Completed => {}
        }

        let produced = {
            let mut guard = summaries.lock().await;
            std::mem::take(&mut *guard)
        };
        for (index, summary) in produced {
            let description = document.entries()[index].description.clone();
            document.set_description(index, format!("{description}{DESCRIPTION_MARKER}{summary}"));
            tracing::info!(
                link = document.entries()[index].link.as_str(),
                "appended summary to entry description"
            );
        }

        Ok(RunOutcome::Completed)
    }
}
