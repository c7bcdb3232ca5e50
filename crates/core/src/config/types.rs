use std::path::PathBuf;
use std::str::FromStr;

use url::Url;

/// Errors raised while building or validating the run configuration.
///
/// All of these are detected eagerly, before any concurrent work starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The endpoint URL did not parse.
    #[error("invalid endpoint URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },

    /// The endpoint URL uses a scheme the transport cannot speak.
    #[error("unsupported URL scheme '{scheme}', expected http or https")]
    UnsupportedScheme { scheme: String },

    /// The endpoint URL has no host component.
    #[error("endpoint URL has no host")]
    MissingHost,

    /// The HTTP method name did not match any known verb.
    #[error("unknown HTTP method '{0}'")]
    UnknownMethod(String),

    /// A header flag was not of the form `Name: Value`.
    #[error("malformed header '{0}', expected 'Name: Value'")]
    MalformedHeader(String),

    /// The log level name did not match any known level.
    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    /// A concurrency limit was zero or negative.
    #[error("{pool} concurrency must be a positive integer, got {value}")]
    InvalidConcurrency { pool: &'static str, value: i64 },
}

/// HTTP verb used for the chat-endpoint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    /// Canonical request-line spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            "head" => Ok(HttpMethod::Head),
            _ => Err(ConfigError::UnknownMethod(s.to_string())),
        }
    }
}

/// Immutable configuration for one run.
///
/// Constructed once from the command line before the runtime starts and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Subtitle language passed to the caption extractor.
    pub language: String,
    /// Jinja template producing the LLM prompt.
    pub prompt_template: String,
    /// Jinja template producing the HTTP request body.
    pub body_template: String,
    /// Chat endpoint.
    pub url: Url,
    pub method: HttpMethod,
    /// Extra request headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Root folder of the summary cache.
    pub summary_cache_dir: PathBuf,
    /// Root folder of the subtitle cache.
    pub subtitle_cache_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_level: tracing::Level,
    /// Concurrent caption-extractor processes.
    pub jobs_subtitles: usize,
    /// Concurrent chat-endpoint requests.
    pub jobs_requests: usize,
    /// Whether short-form entries are summarized instead of skipped.
    pub proceed_with_shorts: bool,
}

/// Splits a `Name: Value` header flag, trimming both sides.
pub fn parse_header(raw: &str) -> Result<(String, String), ConfigError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| ConfigError::MalformedHeader(raw.to_string()))?;
    let name = name.trim();
    let value = value.trim();
    if name.is_empty() {
        return Err(ConfigError::MalformedHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.to_string()))
}
