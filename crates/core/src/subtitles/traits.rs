//! Trait definition for caption extraction.

use async_trait::async_trait;

use super::error::SubtitleError;

/// Extracts post-processed captions for a video.
#[async_trait]
pub trait SubtitleFetcher: Send + Sync {
    /// Returns the captions for the video behind `link` in `language`.
    ///
    /// Callers must already hold a subprocess-pool permit; the fetcher
    /// never gates itself.
    async fn fetch(&self, link: &str, language: &str) -> Result<String, SubtitleError>;
}
