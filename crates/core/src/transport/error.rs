//! Error types for the transport module.

use thiserror::Error;

/// Errors raised during one request/response exchange, tagged with the
/// phase they occurred in and the peer they targeted.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The endpoint scheme is neither http nor https.
    #[error("unsupported URL scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// The endpoint URL has no host component.
    #[error("endpoint URL has no host")]
    MissingHost,

    /// DNS resolution failed.
    #[error("DNS resolution of {host}:{port} failed: {source}")]
    Resolve {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// DNS resolution produced no usable address.
    #[error("{host}:{port} did not resolve to any address")]
    NoAddresses { host: String, port: u16 },

    /// No resolved address accepted the connection.
    #[error("connecting to {host}:{port} failed: {source}")]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// The connect budget (TCP connect plus TLS handshake) elapsed.
    #[error("connecting to {host}:{port} timed out after {seconds}s")]
    ConnectTimeout {
        host: String,
        port: u16,
        seconds: u64,
    },

    /// The host is not a valid TLS server name.
    #[error("invalid TLS server name '{host}'")]
    InvalidServerName { host: String },

    /// The TLS handshake failed, including certificate verification.
    #[error("TLS handshake with {host} failed: {source}")]
    Handshake {
        host: String,
        source: std::io::Error,
    },

    /// Writing the request failed.
    #[error("writing request to {host} failed: {source}")]
    Write {
        host: String,
        source: std::io::Error,
    },

    /// Reading the response failed.
    #[error("reading response from {host} failed: {source}")]
    Read {
        host: String,
        source: std::io::Error,
    },

    /// The response outgrew the receive buffer limit.
    #[error("response from {host} exceeded {limit} bytes")]
    ResponseTooLarge { host: String, limit: usize },

    /// The response budget elapsed before the exchange finished.
    #[error("no complete response from {host} within {seconds}s")]
    ResponseTimeout { host: String, seconds: u64 },

    /// The response could not be parsed as HTTP/1.1.
    #[error("malformed response from {host}: {reason}")]
    MalformedResponse { host: String, reason: String },

    /// Closing the connection failed in a non-benign way.
    #[error("closing connection to {host} failed: {source}")]
    Shutdown {
        host: String,
        source: std::io::Error,
    },
}
