//! Command-line surface and construction of the run configuration.

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use tubedigest_core::{parse_header, validate_config, ConfigError, HttpMethod, RunConfig};

const DEFAULT_BODY_TEMPLATE: &str = r#"{
    "model": "gemma3:4b-it-qat",
    "stream": false,
    "messages": [
      {
        "role": "user",
        "content": "{{ prompt }}"
      }
    ]
}"#;

const DEFAULT_PROMPT_TEMPLATE: &str = r#"Always be brutally honest (to the point of being a little bit rude), smart, and extremely laconic.
Do not rewrite instructions provided by user.
You will be supplied with author's name, title, description and subtitles of a YouTube video.
Please, provide a summary with main points.

Author's name:
```
{{ author }}
```

Title:
```
{{ title }}
```

```
{{ description }}
```

Subtitles:
```
{{ subtitles }}
```
"#;

/// Post-processor for YouTube's RSS feed: reads the feed from stdin,
/// appends a chat-endpoint summary of each video's captions to the
/// entry descriptions, and writes the feed back to stdout.
#[derive(Debug, Parser)]
#[command(name = "tube-digest", version)]
pub struct Args {
    /// Subtitle language requested from yt-dlp.
    #[arg(short = 'L', long, default_value = "en")]
    pub language: String,

    /// Chat endpoint URL, e.g. an Ollama instance.
    #[arg(short = 'u', long, default_value = "http://127.0.0.1:11434/api/chat")]
    pub url: String,

    /// HTTP method for the chat request.
    #[arg(short = 'X', long, default_value = "post")]
    pub method: String,

    /// Jinja template for the HTTP request body.
    #[arg(short = 'T', long = "template", default_value = DEFAULT_BODY_TEMPLATE)]
    pub body_template: String,

    /// Jinja template for the prompt.
    #[arg(short = 'P', long = "prompt", default_value = DEFAULT_PROMPT_TEMPLATE)]
    pub prompt_template: String,

    /// Request header as 'Name: Value'; repeatable.
    #[arg(short = 'H', long = "header", default_value = "Content-Type: application/json")]
    pub headers: Vec<String>,

    /// Folder holding one file per cached summary.
    #[arg(short = 'c', long = "cache-folder")]
    pub cache_folder: PathBuf,

    /// Folder holding one file per cached subtitle extraction.
    #[arg(short = 'S', long = "cache-folder-subtitles")]
    pub cache_folder_subtitles: PathBuf,

    /// File receiving internal logs; stdout stays reserved for the feed.
    #[arg(short = 'l', long, default_value = "./logs.log")]
    pub log_file: PathBuf,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Summarize short-form videos instead of skipping them.
    #[arg(short = 's', long = "proceed-shorts")]
    pub proceed_shorts: bool,

    /// Concurrent yt-dlp processes.
    #[arg(short = 'j', long = "jobs-yt-dlp", default_value_t = 5, allow_negative_numbers = true)]
    pub jobs_yt_dlp: i64,

    /// Concurrent chat-endpoint requests.
    #[arg(short = 'J', long = "jobs-requests", default_value_t = 6, allow_negative_numbers = true)]
    pub jobs_requests: i64,
}

impl Args {
    /// Builds and validates the immutable run configuration, before any
    /// async work starts.
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let url = Url::parse(&self.url).map_err(|error| ConfigError::InvalidUrl {
            value: self.url.clone(),
            reason: error.to_string(),
        })?;
        let method: HttpMethod = self.method.parse()?;
        let headers = self
            .headers
            .iter()
            .map(|raw| parse_header(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let log_level = parse_log_level(&self.log_level)?;
        let jobs_subtitles = positive_jobs("yt-dlp", self.jobs_yt_dlp)?;
        let jobs_requests = positive_jobs("request", self.jobs_requests)?;

        let config = RunConfig {
            language: self.language,
            prompt_template: self.prompt_template,
            body_template: self.body_template,
            url,
            method,
            headers,
            summary_cache_dir: self.cache_folder,
            subtitle_cache_dir: self.cache_folder_subtitles,
            log_file: self.log_file,
            log_level,
            jobs_subtitles,
            jobs_requests,
            proceed_with_shorts: self.proceed_shorts,
        };
        validate_config(&config)?;
        Ok(config)
    }
}

fn parse_log_level(raw: &str) -> Result<tracing::Level, ConfigError> {
    raw.parse::<tracing::Level>()
        .map_err(|_| ConfigError::UnknownLogLevel(raw.to_string()))
}

fn positive_jobs(pool: &'static str, value: i64) -> Result<usize, ConfigError> {
    if value < 1 {
        return Err(ConfigError::InvalidConcurrency { pool, value });
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["tube-digest", "-c", "/tmp/sums", "-S", "/tmp/subs"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn test_defaults_match_the_documented_surface() {
        let config = parse(&[]).into_config().unwrap();
        assert_eq!(config.language, "en");
        assert_eq!(config.url.as_str(), "http://127.0.0.1:11434/api/chat");
        assert_eq!(config.method, HttpMethod::Post);
        assert_eq!(
            config.headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );
        assert_eq!(config.jobs_subtitles, 5);
        assert_eq!(config.jobs_requests, 6);
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert!(!config.proceed_with_shorts);
        assert!(config.body_template.contains("{{ prompt }}"));
        assert!(config.prompt_template.contains("{{ subtitles }}"));
    }

    #[test]
    fn test_cache_folders_are_required() {
        assert!(Args::try_parse_from(["tube-digest"]).is_err());
        assert!(Args::try_parse_from(["tube-digest", "-c", "/tmp/sums"]).is_err());
    }

    #[test]
    fn test_repeated_headers_accumulate() {
        let config = parse(&["-H", "X-One: 1", "-H", "X-Two: 2"]).into_config().unwrap();
        assert_eq!(
            config.headers,
            vec![
                ("X-One".to_string(), "1".to_string()),
                ("X-Two".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_concurrency_is_an_invalid_value() {
        let err = parse(&["-j", "-2"]).into_config().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidConcurrency {
                pool: "yt-dlp",
                value: -2,
            }
        ));
    }

    #[test]
    fn test_zero_concurrency_is_an_invalid_value() {
        let err = parse(&["-J", "0"]).into_config().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidConcurrency { pool: "request", .. }
        ));
    }

    #[test]
    fn test_unknown_method_is_a_config_error() {
        let err = parse(&["-X", "purge"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMethod(_)));
    }

    #[test]
    fn test_bad_url_is_a_config_error() {
        let err = parse(&["-u", "not a url"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_unknown_log_level_is_a_config_error() {
        let err = parse(&["--log-level", "chatty"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLogLevel(_)));
    }

    #[test]
    fn test_malformed_header_is_a_config_error() {
        let err = parse(&["-H", "no-colon-here"]).into_config().unwrap_err();
        assert!(matches!(err, ConfigError::MalformedHeader(_)));
    }
}
