//! `tube-digest` binary: wiring, signal handling and exit codes.
//!
//! The feed travels stdin -> orchestrator -> stdout; logs go to the
//! configured file so the output stream stays clean. Each failure stage
//! maps to its own exit code, so callers can tell a bad flag from a
//! broken cache folder from a model that stopped speaking JSON.

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::error::ErrorKind;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tubedigest_core::{
    Cache, ConfigError, EntryPipeline, FeedDocument, HashedFileCache, HttpTransport, Orchestrator,
    PipelineError, ResourceGate, RunConfig, RunOutcome, YtDlpFetcher,
};

use args::Args;

const EXIT_BAD_ARGS: u8 = 1;
const EXIT_BAD_VALUE: u8 = 2;
const EXIT_CONFIG: u8 = 3;
const EXIT_CACHE: u8 = 4;
const EXIT_RUNTIME: u8 = 5;
const EXIT_RESPONSE_PARSE: u8 = 6;
const EXIT_LOGGER: u8 = 7;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error)
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            let _ = error.print();
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            let _ = error.print();
            return ExitCode::from(EXIT_BAD_ARGS);
        }
    };

    let config = match args.into_config() {
        Ok(config) => Arc::new(config),
        Err(error) => {
            eprintln!("tube-digest: invalid configuration: {error}");
            return ExitCode::from(config_exit_code(&error));
        }
    };

    if let Err(error) = init_logging(&config) {
        eprintln!("tube-digest: {error:#}");
        return ExitCode::from(EXIT_LOGGER);
    }

    run(config).await
}

async fn run(config: Arc<RunConfig>) -> ExitCode {
    info!(
        url = config.url.as_str(),
        jobs_subtitles = config.jobs_subtitles,
        jobs_requests = config.jobs_requests,
        "configuration loaded"
    );

    let summary_cache = match HashedFileCache::new(&config.summary_cache_dir) {
        Ok(cache) => Arc::new(cache),
        Err(error) => return fail(EXIT_CACHE, &error),
    };
    let subtitle_cache = match HashedFileCache::new(&config.subtitle_cache_dir) {
        Ok(cache) => Arc::new(cache),
        Err(error) => return fail(EXIT_CACHE, &error),
    };
    info!("cache folders ready");

    let feed_xml = match read_feed().await {
        Ok(xml) => xml,
        Err(error) => return fail(EXIT_RUNTIME, &format!("{error:#}")),
    };
    let mut document = match FeedDocument::parse(&feed_xml) {
        Ok(document) => document,
        Err(error) => return fail(EXIT_RUNTIME, &error),
    };
    info!(entries = document.entries().len(), "feed parsed");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("termination signal received, cancelling");
        trigger.cancel();
    });

    let pipeline = Arc::new(EntryPipeline::new(
        Arc::clone(&config),
        Arc::clone(&summary_cache) as Arc<dyn Cache>,
        Arc::clone(&subtitle_cache) as Arc<dyn Cache>,
        Arc::new(YtDlpFetcher::new()),
        Arc::new(HttpTransport::new()),
        ResourceGate::new(config.jobs_subtitles),
        ResourceGate::new(config.jobs_requests),
    ));
    let orchestrator = Orchestrator::new(Arc::clone(&config), pipeline);

    match orchestrator.run(&mut document, cancel).await {
        Ok(RunOutcome::Completed) => {
            let xml = match document.to_xml() {
                Ok(xml) => xml,
                Err(error) => return fail(EXIT_RUNTIME, &error),
            };
            println!("{xml}");
            info!("feed written to stdout");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Cancelled) => {
            // The original behavior: a signalled run exits clean and
            // emits nothing, leaving the caches as they are.
            info!("run cancelled, no feed emitted");
            ExitCode::SUCCESS
        }
        Err(PipelineError::ResponseParse(parse_error)) => {
            error!(
                raw = parse_error.raw.as_str(),
                "model response did not match the expected schema"
            );
            fail(EXIT_RESPONSE_PARSE, &parse_error)
        }
        Err(error) => fail(pipeline_exit_code(&error), &error),
    }
}

async fn read_feed() -> anyhow::Result<String> {
    let mut xml = String::new();
    tokio::io::stdin()
        .read_to_string(&mut xml)
        .await
        .context("reading the feed from stdin")?;
    Ok(xml)
}

fn init_logging(config: &RunConfig) -> anyhow::Result<()> {
    let file = std::fs::File::create(&config.log_file)
        .with_context(|| format!("opening log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("installing tracing subscriber: {error}"))
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn fail(code: u8, error: &dyn std::fmt::Display) -> ExitCode {
    error!("run failed: {error}");
    eprintln!("tube-digest failed: {error}");
    ExitCode::from(code)
}

fn config_exit_code(error: &ConfigError) -> u8 {
    match error {
        ConfigError::InvalidConcurrency { .. } => EXIT_BAD_VALUE,
        _ => EXIT_CONFIG,
    }
}

fn pipeline_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::Cache(_) => EXIT_CACHE,
        PipelineError::ResponseParse(_) => EXIT_RESPONSE_PARSE,
        PipelineError::Subtitles(_) | PipelineError::Template(_) | PipelineError::Network(_) => {
            EXIT_RUNTIME
        }
    }
}
