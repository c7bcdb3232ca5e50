//! The per-entry summarization flow.
//!
//! One [`EntryPipeline::summarize`] call drives a single feed entry
//! through caches, caption extraction, template rendering, the chat
//! endpoint and back into the summary cache. All entries share one
//! pipeline instance; concurrency is bounded by the two gates it holds.

use std::sync::Arc;

use thiserror::Error;

use crate::cache::{Cache, CacheError};
use crate::config::RunConfig;
use crate::feed::FeedEntry;
use crate::llm::{extract_answer, ResponseParseError};
use crate::subtitles::{SubtitleError, SubtitleFetcher};
use crate::sync::ResourceGate;
use crate::template::{escape_json_fragment, render, TemplateError};
use crate::transport::{NetworkError, Transport};

/// Any failure along one entry's flow. There is no retry; the first
/// error aborts the entry and, through the orchestrator, the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Subtitles(#[from] SubtitleError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    ResponseParse(#[from] ResponseParseError),
}

/// Summarizes feed entries against the configured chat endpoint.
pub struct EntryPipeline {
    config: Arc<RunConfig>,
    summary_cache: Arc<dyn Cache>,
    subtitle_cache: Arc<dyn Cache>,
    subtitles: Arc<dyn SubtitleFetcher>,
    transport: Arc<dyn Transport>,
    subtitle_gate: ResourceGate,
    request_gate: ResourceGate,
}

impl EntryPipeline {
    pub fn new(
        config: Arc<RunConfig>,
        summary_cache: Arc<dyn Cache>,
        subtitle_cache: Arc<dyn Cache>,
        subtitles: Arc<dyn SubtitleFetcher>,
        transport: Arc<dyn Transport>,
        subtitle_gate: ResourceGate,
        request_gate: ResourceGate,
    ) -> Self {
        Self {
            config,
            summary_cache,
            subtitle_cache,
            subtitles,
            transport,
            subtitle_gate,
            request_gate,
        }
    }

    /// Produces the summary for `entry`, consulting the caches first.
    ///
    /// On a summary-cache hit nothing else runs. Otherwise captions come
    /// from the subtitle cache or a gated extractor run, the templates
    /// are rendered, and the gated chat request is made. The fresh
    /// summary is stored before it is returned; a write conflict there
    /// is a hard error.
    pub async fn summarize(&self, entry: &FeedEntry) -> Result<String, PipelineError> {
        let link = entry.link.as_str();

        tracing::info!(link, "checking summary cache");
        if let Some(cached) = self.summary_cache.get(link).await? {
            tracing::info!(link, "summary found in cache");
            return Ok(cached);
        }
        tracing::info!(link, "summary not cached");

        let subtitles = match self.subtitle_cache.get(link).await? {
            Some(cached) => {
                tracing::info!(link, "subtitles found in cache");
                cached
            }
            None => {
                let fetched = {
                    let _permit = self.subtitle_gate.acquire().await;
                    self.subtitles.fetch(link, &self.config.language).await?
                };
                self.subtitle_cache.set(link, &fetched).await?;
                tracing::info!(link, "subtitles stored in cache");
                fetched
            }
        };

        let context = serde_json::json!({
            "author": entry.author,
            "title": entry.title,
            "description": entry.description,
            "subtitles": subtitles,
        });
        let prompt = render(&self.config.prompt_template, &context)?;
        let body_context = serde_json::json!({
            "prompt": escape_json_fragment(&prompt),
        });
        let request_body = render(&self.config.body_template, &body_context)?;

        let raw_response = {
            let _permit = self.request_gate.acquire().await;
            self.transport
                .send(
                    &self.config.url,
                    self.config.method,
                    &self.config.headers,
                    &request_body,
                )
                .await?
        };

        let summary = extract_answer(&raw_response)?;

        tracing::debug!(link, "storing summary in cache");
        self.summary_cache.set(link, &summary).await?;

        Ok(summary)
    }
}
