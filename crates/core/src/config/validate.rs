use super::{ConfigError, RunConfig};

/// Validate a run configuration before any async work starts.
///
/// Checks:
/// - the endpoint scheme is http or https and the URL has a host
/// - both concurrency limits are at least 1
pub fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    match config.url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::UnsupportedScheme {
                scheme: other.to_string(),
            });
        }
    }

    if config.url.host_str().is_none() {
        return Err(ConfigError::MissingHost);
    }

    if config.jobs_subtitles == 0 {
        return Err(ConfigError::InvalidConcurrency {
            pool: "yt-dlp",
            value: 0,
        });
    }

    if config.jobs_requests == 0 {
        return Err(ConfigError::InvalidConcurrency {
            pool: "request",
            value: 0,
        });
    }

    Ok(())
}
