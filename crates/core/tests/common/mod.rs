//! Shared harness for the end-to-end scenario tests.

use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use tubedigest_core::testing::{MockSubtitleFetcher, MockTransport};
use tubedigest_core::{
    EntryPipeline, HttpMethod, MemoryCache, Orchestrator, ResourceGate, RunConfig,
};

/// Everything a scenario needs: the orchestrator wired to mocks, plus
/// handles on the mocks, caches and gates for assertions.
pub struct Harness {
    pub summary_cache: Arc<MemoryCache>,
    pub subtitle_cache: Arc<MemoryCache>,
    pub fetcher: Arc<MockSubtitleFetcher>,
    pub transport: Arc<MockTransport>,
    pub subtitle_gate: ResourceGate,
    pub request_gate: ResourceGate,
    pub orchestrator: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: RunConfig) -> Self {
        let config = Arc::new(config);
        let summary_cache = Arc::new(MemoryCache::new());
        let subtitle_cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(MockSubtitleFetcher::new());
        let transport = Arc::new(MockTransport::new());
        let subtitle_gate = ResourceGate::new(config.jobs_subtitles);
        let request_gate = ResourceGate::new(config.jobs_requests);

        let pipeline = Arc::new(EntryPipeline::new(
            Arc::clone(&config),
            Arc::clone(&summary_cache) as _,
            Arc::clone(&subtitle_cache) as _,
            Arc::clone(&fetcher) as _,
            Arc::clone(&transport) as _,
            subtitle_gate.clone(),
            request_gate.clone(),
        ));
        let orchestrator = Orchestrator::new(config, pipeline);

        Self {
            summary_cache,
            subtitle_cache,
            fetcher,
            transport,
            subtitle_gate,
            request_gate,
            orchestrator,
        }
    }
}

pub fn test_config() -> RunConfig {
    RunConfig {
        language: "en".to_string(),
        prompt_template: "{{ author }} | {{ title }} | {{ description }} | {{ subtitles }}"
            .to_string(),
        body_template: r#"{"model":"test","messages":[{"role":"user","content":"{{ prompt }}"}]}"#
            .to_string(),
        url: Url::parse("http://127.0.0.1:11434/api/chat").unwrap(),
        method: HttpMethod::Post,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        summary_cache_dir: PathBuf::from("/tmp/unused-summaries"),
        subtitle_cache_dir: PathBuf::from("/tmp/unused-subtitles"),
        log_file: PathBuf::from("./logs.log"),
        log_level: tracing::Level::INFO,
        jobs_subtitles: 5,
        jobs_requests: 6,
        proceed_with_shorts: false,
    }
}

/// Builds a minimal YouTube-shaped Atom feed from
/// `(link, author, title, description)` tuples.
pub fn feed_xml(entries: &[(&str, &str, &str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <title>Test Channel</title>
"#,
    );
    for (link, author, title, description) in entries {
        xml.push_str(&format!(
            r#" <entry>
  <title>{title}</title>
  <link rel="alternate" href="{link}"/>
  <author>
   <name>{author}</name>
  </author>
  <media:group>
   <media:title>{title}</media:title>
   <media:description>{description}</media:description>
  </media:group>
 </entry>
"#
        ));
    }
    xml.push_str("</feed>");
    xml
}
