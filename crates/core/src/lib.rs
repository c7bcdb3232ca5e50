//! Core library of `tube-digest`, a batch post-processor for YouTube
//! RSS feeds.
//!
//! The feed comes in on one side, and for every video entry a summary
//! of the video's captions is produced by a chat endpoint and appended
//! to the entry's description. [`orchestrator::Orchestrator`] fans one
//! [`pipeline::EntryPipeline`] flow out per entry, bounded by the two
//! [`sync::ResourceGate`]s and raced against a cancellation signal.

pub mod cache;
pub mod config;
pub mod feed;
pub mod llm;
pub mod orchestrator;
pub mod pipeline;
pub mod subtitles;
pub mod sync;
pub mod template;
pub mod testing;
pub mod transport;

pub use cache::{physical_key, Cache, CacheError, HashedFileCache, MemoryCache};
pub use config::{parse_header, validate_config, ConfigError, HttpMethod, RunConfig};
pub use feed::{FeedDocument, FeedEntry, FeedError};
pub use llm::{extract_answer, ResponseParseError};
pub use orchestrator::{Orchestrator, RunOutcome, DESCRIPTION_MARKER};
pub use pipeline::{EntryPipeline, PipelineError};
pub use subtitles::{SubtitleError, SubtitleFetcher, YtDlpFetcher};
pub use sync::{GroupOutcome, Permit, ResourceGate, TaskGroup};
pub use template::{escape_json_fragment, render, TemplateError};
pub use transport::{HttpTransport, NetworkError, Transport};
