//! yt-dlp based caption extraction.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::error::SubtitleError;
use super::traits::SubtitleFetcher;

/// Builds the single shell pipeline that downloads a video's subtitles,
/// strips VTT timestamps, cue numbers, markup and blank lines, flattens
/// the text onto one line and deletes the temporary file again.
fn build_command(link: &str, language: &str) -> String {
    format!(
        r##"yt-dlp -q --no-progress --no-warnings --skip-download --write-subs --write-auto-subs --sub-lang {language} --convert-subs vtt --exec before_dl:"cat %(requested_subtitles.:.filepath)#q | sed -e '/^[0-9][0-9]:[0-9][0-9]:[0-9][0-9].[0-9][0-9][0-9] --> [0-9][0-9]:[0-9][0-9]:[0-9][0-9].[0-9][0-9][0-9]/d' -e '/^[[:digit:]]\{{1,3\}}\$/d' -e 's/<[^>]*>//g' -e '/^[[:space:]]*$/d' -e '1,3d' -e \"s/'/\\\\'/g\" -e 's/\"/\\\"/g' | sed -z 's/\n/ /g' && rm %(requested_subtitles.:.filepath)#q " '{link}'"##
    )
}

/// Runs a shell pipeline with stdout piped, draining the pipe and
/// waiting for termination concurrently.
///
/// Returns the captured output together with the exit status. The pipe
/// is read to end-of-stream with no upper size bound.
async fn run_pipeline(command: &str) -> Result<(Vec<u8>, std::process::ExitStatus), SubtitleError> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SubtitleError::Spawn { source })?;

    let mut stdout = child.stdout.take().expect("stdout is piped");
    let mut captured = Vec::new();

    let (read, waited) = tokio::join!(stdout.read_to_end(&mut captured), child.wait());
    read.map_err(|source| SubtitleError::Read { source })?;
    let status = waited.map_err(|source| SubtitleError::Wait { source })?;

    Ok((captured, status))
}

/// Caption extraction via a yt-dlp shell pipeline.
#[derive(Debug, Default)]
pub struct YtDlpFetcher;

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SubtitleFetcher for YtDlpFetcher {
    async fn fetch(&self, link: &str, language: &str) -> Result<String, SubtitleError> {
        let command = build_command(link, language);
        tracing::info!(link, language, "running caption extractor");

        let (captured, status) = run_pipeline(&command).await?;

        if !status.success() {
            // Videos without captions make yt-dlp exit nonzero while the
            // pipeline still printed whatever it had; keep the output.
            tracing::warn!(
                link,
                ?status,
                captured_bytes = captured.len(),
                "caption extractor exited abnormally, keeping captured output"
            );
        } else {
            tracing::info!(link, captured_bytes = captured.len(), "captions received");
        }

        Ok(String::from_utf8_lossy(&captured).into_owned())
    }
}
