//! Mock transport for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

use crate::config::HttpMethod;
use crate::transport::{NetworkError, Transport};

/// A recorded exchange for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Mock implementation of [`Transport`].
///
/// Answers with queued one-shot responses first, then with the default
/// response, optionally after a delay; every request is recorded. Like
/// the real transport it never interprets what it carries.
#[derive(Debug)]
pub struct MockTransport {
    queued_responses: RwLock<VecDeque<String>>,
    default_response: RwLock<String>,
    next_error: RwLock<Option<NetworkError>>,
    delay: RwLock<Duration>,
    requests: RwLock<Vec<RecordedRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            queued_responses: RwLock::new(VecDeque::new()),
            default_response: RwLock::new(r#"{"message":{"content":"Summary."}}"#.to_string()),
            next_error: RwLock::new(None),
            delay: RwLock::new(Duration::ZERO),
            requests: RwLock::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Replace the default response body.
    pub async fn set_response(&self, body: &str) {
        *self.default_response.write().await = body.to_string();
    }

    /// Queue a one-shot response consumed before the default.
    pub async fn push_response(&self, body: &str) {
        self.queued_responses
            .write()
            .await
            .push_back(body.to_string());
    }

    /// Make every exchange take this long before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Configure the next exchange to fail with the given error.
    pub async fn set_next_error(&self, error: NetworkError) {
        *self.next_error.write().await = Some(error);
    }

    /// All recorded requests, in call order.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Highest number of exchanges observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        url: &Url,
        method: HttpMethod,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<String, NetworkError> {
        self.requests.write().await.push(RecordedRequest {
            url: url.clone(),
            method,
            headers: headers.to_vec(),
            body: body.to_string(),
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

        if let Some(queued) = self.queued_responses.write().await.pop_front() {
            return Ok(queued);
        }
        Ok(self.default_response.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat_url() -> Url {
        Url::parse("http://127.0.0.1:11434/api/chat").unwrap()
    }

    #[tokio::test]
    async fn test_returns_default_response() {
        let transport = MockTransport::new();
        let body = transport
            .send(&chat_url(), HttpMethod::Post, &[], "{}")
            .await
            .unwrap();
        assert_eq!(body, r#"{"message":{"content":"Summary."}}"#);
    }

    #[tokio::test]
    async fn test_queued_responses_come_first() {
        let transport = MockTransport::new();
        transport.push_response("first").await;
        transport.push_response("second").await;

        let url = chat_url();
        let mut bodies = Vec::new();
        for _ in 0..3 {
            bodies.push(
                transport
                    .send(&url, HttpMethod::Post, &[], "{}")
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(
            bodies,
            vec![
                "first".to_string(),
                "second".to_string(),
                r#"{"message":{"content":"Summary."}}"#.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_records_the_exchange() {
        let transport = MockTransport::new();
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        transport
            .send(&chat_url(), HttpMethod::Post, &headers, r#"{"p":1}"#)
            .await
            .unwrap();

        let recorded = transport.recorded_requests().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, HttpMethod::Post);
        assert_eq!(recorded[0].body, r#"{"p":1}"#);
        assert_eq!(recorded[0].headers, headers);
    }

    #[tokio::test]
    async fn test_error_injection_is_one_shot() {
        let transport = MockTransport::new();
        transport
            .set_next_error(NetworkError::MissingHost)
            .await;

        assert!(transport
            .send(&chat_url(), HttpMethod::Post, &[], "{}")
            .await
            .is_err());
        assert!(transport
            .send(&chat_url(), HttpMethod::Post, &[], "{}")
            .await
            .is_ok());
    }
}
