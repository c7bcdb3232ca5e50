//! Mock subtitle fetcher for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::subtitles::{SubtitleError, SubtitleFetcher};

/// A recorded caption fetch for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub link: String,
    pub language: String,
}

/// Mock implementation of [`SubtitleFetcher`].
///
/// Returns captions configured per link (or a default), optionally
/// after a delay, and records every call. `max_in_flight` reports the
/// highest number of concurrently running fetches observed, which is
/// what the subprocess-gate tests assert on.
#[derive(Debug, Default)]
pub struct MockSubtitleFetcher {
    subtitles: RwLock<HashMap<String, String>>,
    default_subtitles: RwLock<Option<String>>,
    next_error: RwLock<Option<SubtitleError>>,
    delay: RwLock<Duration>,
    fetches: RwLock<Vec<RecordedFetch>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockSubtitleFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the captions returned for a specific link.
    pub async fn set_subtitles(&self, link: &str, text: &str) {
        self.subtitles
            .write()
            .await
            .insert(link.to_string(), text.to_string());
    }

    /// Configure the captions returned for links without a specific
    /// entry. Unconfigured links otherwise yield an empty string, like
    /// an extractor run for a video without captions.
    pub async fn set_default_subtitles(&self, text: &str) {
        *self.default_subtitles.write().await = Some(text.to_string());
    }

    /// Make every fetch take this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: SubtitleError) {
        *self.next_error.write().await = Some(error);
    }

    /// All recorded fetches, in call order.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Highest number of fetches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubtitleFetcher for MockSubtitleFetcher {
    async fn fetch(&self, link: &str, language: &str) -> Result<String, SubtitleError> {
        self.fetches.write().await.push(RecordedFetch {
            link: link.to_string(),
            language: language.to_string(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(text) = self.subtitles.read().await.get(link) {
            return Ok(text.clone());
        }
        Ok(self
            .default_subtitles
            .read()
            .await
            .clone()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_configured_subtitles() {
        let fetcher = MockSubtitleFetcher::new();
        fetcher.set_subtitles("link-a", "hello world").await;

        assert_eq!(fetcher.fetch("link-a", "en").await.unwrap(), "hello world");
        assert_eq!(fetcher.fetch("link-b", "en").await.unwrap(), "");
        assert_eq!(fetcher.fetch_count().await, 2);
    }

    #[tokio::test]
    async fn test_records_link_and_language() {
        let fetcher = MockSubtitleFetcher::new();
        fetcher.fetch("link-a", "de").await.unwrap();

        let recorded = fetcher.recorded_fetches().await;
        assert_eq!(
            recorded,
            vec![RecordedFetch {
                link: "link-a".to_string(),
                language: "de".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_error_injection_is_one_shot() {
        let fetcher = MockSubtitleFetcher::new();
        fetcher
            .set_next_error(SubtitleError::Spawn {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no yt-dlp"),
            })
            .await;

        assert!(fetcher.fetch("link-a", "en").await.is_err());
        assert!(fetcher.fetch("link-a", "en").await.is_ok());
    }

    #[tokio::test]
    async fn test_tracks_concurrent_fetches() {
        let fetcher = std::sync::Arc::new(MockSubtitleFetcher::new());
        fetcher.set_delay(Duration::from_millis(20)).await;

        let mut handles = Vec::new();
        for index in 0..3 {
            let fetcher = std::sync::Arc::clone(&fetcher);
            handles.push(tokio::spawn(async move {
                fetcher.fetch(&format!("link-{index}"), "en").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(fetcher.max_in_flight() > 1);
    }
}
