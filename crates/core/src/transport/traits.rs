//! Trait definition for the request/response exchange.

use async_trait::async_trait;
use url::Url;

use crate::config::HttpMethod;

use super::error::NetworkError;

/// Performs one HTTP(S) request/response exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `body` to `url` and returns the raw response body.
    ///
    /// The response body is returned for any status code; interpreting
    /// it is the caller's concern.
    async fn send(
        &self,
        url: &Url,
        method: HttpMethod,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<String, NetworkError>;
}
