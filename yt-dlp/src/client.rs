use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::ExitStatus;

use futures_core::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::StreamExt;

use crate::command::{CommandBuilder, PROGRESS_TEMPLATE};
use crate::error::{Error, Result};
use crate::types::{DownloadEvent, DownloadOptions, DownloadProgress, Extraction, StreamKind, VideoInfo};

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    cookies_file: Option<PathBuf>,
    extra_args: Vec<String>,
    ffmpeg_location: Option<PathBuf>,
    env_vars: HashMap<String, String>
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlp {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: path.into(),
            cookies_file: None,
            extra_args: Vec::new(),
            ffmpeg_location: None,
            env_vars: HashMap::new()
        }
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    pub fn set_cookies_file(&mut self, path: Option<PathBuf>) {
        self.cookies_file = path;
    }

    pub fn set_extra_args(&mut self, args: Vec<String>) {
        self.extra_args = args;
    }

    pub fn set_ffmpeg_location(&mut self, path: Option<PathBuf>) {
        self.ffmpeg_location = path;
    }

    pub fn set_env(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }

    pub async fn check_binary(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(Error::BinaryNotExecutable(self.binary.clone()))
        }
    }

    pub async fn get_video_info(&self, url: &str) -> Result<VideoInfo> {
        let output = self
            .command()
            .json_output()
            .skip_download()
            .no_playlist()
            .no_warnings()
            .url(url)
            .build_with_env(&self.env_vars)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(Error::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr
            });
        }

        let info: VideoInfo = serde_json::from_slice(&output.stdout)?;
        Ok(info)
    }

    /// Download `url` and return the final info document, ignoring progress.
    pub async fn extract(&self, url: &str, options: &DownloadOptions) -> Result<Extraction> {
        let stream = self.extract_with_progress(url, options);
        tokio::pin!(stream);

        while let Some(event) = stream.next().await {
            if let DownloadEvent::Extracted(extraction) = event? {
                return Ok(*extraction);
            }
        }

        Err(Error::MissingOutput)
    }

    /// Download `url`, yielding progress events and finishing with
    /// [`DownloadEvent::Extracted`] or an error.
    pub fn extract_with_progress(
        &self,
        url: &str,
        options: &DownloadOptions
    ) -> Pin<Box<dyn Stream<Item = Result<DownloadEvent>> + Send + 'static>> {
        let url = url.to_string();
        let ignore_errors = options.ignore_errors;
        let builder = self
            .command()
            .with_options(options)
            .single_json_output()
            .no_simulate()
            .force_progress()
            .newline_progress()
            .progress_template(PROGRESS_TEMPLATE)
            .url(&url);
        let binary = self.binary.clone();
        let env_vars = self.env_vars.clone();

        Box::pin(async_stream::try_stream! {
            yield DownloadEvent::Extracting { url: url.clone() };

            tracing::debug!(
                binary = %binary.display(),
                args = ?builder.get_args(),
                "spawning yt-dlp"
            );

            let mut cmd = builder.build_with_env(&env_vars);
            cmd.stdout(std::process::Stdio::piped());
            cmd.stderr(std::process::Stdio::piped());
            cmd.kill_on_drop(true);

            let mut child = cmd.spawn()?;
            let stdout = child.stdout.take().ok_or(Error::MissingOutput)?;
            let stderr = child.stderr.take().ok_or(Error::MissingOutput)?;

            // yt-dlp output is not guaranteed to be UTF-8; lines are decoded lossily.
            let mut out_lines = BufReader::new(stdout).split(b'\n');
            let mut err_lines = BufReader::new(stderr).split(b'\n');
            let mut out_open = true;
            let mut err_open = true;

            let mut document: Option<Vec<u8>> = None;
            let mut error_messages: Vec<String> = Vec::new();
            let mut current_filename: Option<String> = None;

            while out_open || err_open {
                let (segment, from_stdout) = tokio::select! {
                    segment = out_lines.next_segment(), if out_open => (segment, true),
                    segment = err_lines.next_segment(), if err_open => (segment, false)
                };

                let Some(segment) = segment? else {
                    if from_stdout {
                        out_open = false;
                    } else {
                        err_open = false;
                    }
                    continue;
                };

                if from_stdout && segment.trim_ascii_start().starts_with(b"{") {
                    document = Some(segment);
                    continue;
                }

                let line = String::from_utf8_lossy(&segment);
                let line = line.trim_end_matches('\r');
                tracing::debug!(target: "yt_dlp::output", "{}", line);

                if let Some(event) = parse_progress_line(line, &mut current_filename) {
                    if let DownloadEvent::Error { ref message } = event {
                        error_messages.push(message.clone());
                    }
                    yield event;
                }
            }

            let status = child.wait().await?;
            let extraction = finish_extraction(status, document.as_deref(), &error_messages, ignore_errors)?;

            if let Some(filename) = current_filename {
                yield DownloadEvent::Finished { filename };
            }
            yield DownloadEvent::Extracted(Box::new(extraction));
        })
    }

    fn command(&self) -> CommandBuilder {
        let mut builder = CommandBuilder::new(&self.binary)
            .cookies_file_opt(self.cookies_file.as_ref())
            .args(self.extra_args.iter().map(String::as_str));

        if let Some(ref ffmpeg_path) = self.ffmpeg_location {
            builder = builder.ffmpeg_location(ffmpeg_path);
        }

        builder
    }
}

/// Turn the exit status, the JSON document and collected `ERROR:` lines into
/// a result, telling post-processing failures apart from extraction failures.
fn finish_extraction(
    status: ExitStatus,
    document: Option<&[u8]>,
    error_messages: &[String],
    ignore_errors: bool
) -> Result<Extraction> {
    if let Some(document) = document
        && (status.success() || ignore_errors)
    {
        return Extraction::from_slice(document);
    }

    if status.success() {
        return Err(Error::MissingOutput);
    }

    let message = error_messages.join("; ");
    if error_messages.iter().any(|m| is_postprocessing_error(m)) {
        return Err(Error::PostProcessingFailed(message));
    }

    Err(Error::ExtractionFailed {
        code: status.code().unwrap_or(-1),
        message
    })
}

fn is_postprocessing_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.starts_with("postprocessing:")
        || lower.contains("conversion failed")
        || lower.contains("ffmpeg exited with code")
}

fn parse_progress_line(line: &str, current_filename: &mut Option<String>) -> Option<DownloadEvent> {
    let line = line.trim();

    if line.starts_with("[download] Destination:") {
        let filename = line.trim_start_matches("[download] Destination:").trim();
        *current_filename = Some(filename.to_string());
        return Some(DownloadEvent::DownloadStarted {
            filename: filename.to_string()
        });
    }

    if line.starts_with("[progress]")
        && let Some(progress) = parse_template_progress(line)
    {
        return Some(DownloadEvent::Progress(progress));
    }

    if line.starts_with("[download]")
        && line.contains('%')
        && let Some(progress) = parse_download_progress(line)
    {
        return Some(DownloadEvent::Progress(progress));
    }

    if line.starts_with("[Merger]") || line.contains("Merging formats") {
        if let Some(start) = line.find('"')
            && let Some(end) = line.rfind('"')
            && end > start
        {
            *current_filename = Some(line[start + 1..end].to_string());
        }
        return Some(DownloadEvent::MergingFormats);
    }

    if line.starts_with("[ExtractAudio]") {
        if let Some(destination) = line.split("Destination:").nth(1) {
            *current_filename = Some(destination.trim().to_string());
        }
        return Some(DownloadEvent::PostProcessing {
            status: line.to_string()
        });
    }

    if line.starts_with("[ffmpeg]") || line.starts_with("[FixupM3u8]") {
        return Some(DownloadEvent::PostProcessing {
            status: line.to_string()
        });
    }

    if line.contains("has already been downloaded") {
        if let Some(name) = line
            .trim_start_matches("[download]")
            .split(" has already been downloaded")
            .next()
        {
            *current_filename = Some(name.trim().to_string());
        }
        let filename = current_filename.clone().unwrap_or_default();
        return Some(DownloadEvent::Finished { filename });
    }

    if line.starts_with("WARNING:") {
        return Some(DownloadEvent::Warning {
            message: line.trim_start_matches("WARNING:").trim().to_string()
        });
    }

    if line.starts_with("ERROR:") {
        return Some(DownloadEvent::Error {
            message: line.trim_start_matches("ERROR:").trim().to_string()
        });
    }

    None
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn parse_download_progress(line: &str) -> Option<DownloadProgress> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let mut percent: Option<f64> = None;
    let mut total_bytes: Option<u64> = None;
    let mut speed: Option<f64> = None;
    let mut eta: Option<f64> = None;

    for (i, part) in parts.iter().enumerate() {
        if part.ends_with('%') {
            percent = part.trim_end_matches('%').parse().ok();
        } else if part.contains("/s") {
            speed = parse_speed(part);
        } else if part.ends_with('B') {
            total_bytes = parse_size(part.trim_start_matches('~'));
        } else if i > 0 && parts.get(i - 1) == Some(&"ETA") {
            eta = parse_eta(part);
        }
    }

    percent?;

    let downloaded_bytes = match (percent, total_bytes) {
        (Some(p), Some(t)) => ((p / 100.0) * t as f64) as u64,
        _ => 0
    };

    Some(DownloadProgress {
        downloaded_bytes,
        total_bytes,
        speed,
        eta,
        percent,
        stream: StreamKind::Unknown
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn parse_template_progress(line: &str) -> Option<DownloadProgress> {
    let content = line.trim_start_matches("[progress]").trim();
    let parts: Vec<&str> = content.split_whitespace().collect();

    if parts.is_empty() {
        return None;
    }

    let percent = parts.first().and_then(|p| {
        p.trim_end_matches('%').trim().parse::<f64>().ok()
    });

    let total_bytes = parts.get(1).and_then(|s| parse_size(s));
    let speed = parts.get(2).and_then(|s| parse_speed(s));
    let eta = parts.get(3).and_then(|s| parse_eta(s));
    let stream = StreamKind::from_codecs(parts.get(4).copied(), parts.get(5).copied());

    let downloaded_bytes = match (percent, total_bytes) {
        (Some(p), Some(t)) => ((p / 100.0) * t as f64) as u64,
        _ => 0
    };

    Some(DownloadProgress {
        downloaded_bytes,
        total_bytes,
        speed,
        eta,
        percent,
        stream
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim();
    if s == "N/A" || s == "~" || s.is_empty() {
        return None;
    }

    let multipliers = [
        ("GiB", 1024u64 * 1024 * 1024),
        ("MiB", 1024 * 1024),
        ("KiB", 1024),
        ("GB", 1000 * 1000 * 1000),
        ("MB", 1000 * 1000),
        ("KB", 1000),
        ("B", 1)
    ];

    for (suffix, mult) in multipliers {
        if let Some(num_str) = s.strip_suffix(suffix)
            && let Ok(num) = num_str.trim().parse::<f64>()
        {
            return Some((num * mult as f64) as u64);
        }
    }

    None
}

#[allow(clippy::cast_precision_loss)]
fn parse_speed(s: &str) -> Option<f64> {
    let s = s.trim().trim_end_matches("/s");
    parse_size(s).map(|b| b as f64)
}

fn parse_eta(s: &str) -> Option<f64> {
    let s = s.trim();
    if s == "N/A" || s == "NA" || s == "Unknown" || s.is_empty() {
        return None;
    }

    let parts: Vec<&str> = s.split(':').collect();
    match parts.len() {
        1 => parts[0].parse::<f64>().ok(),
        2 => {
            let mins: f64 = parts[0].parse().ok()?;
            let secs: f64 = parts[1].parse().ok()?;
            Some(mins * 60.0 + secs)
        }
        3 => {
            let hours: f64 = parts[0].parse().ok()?;
            let mins: f64 = parts[1].parse().ok()?;
            let secs: f64 = parts[2].parse().ok()?;
            Some(hours * 3600.0 + mins * 60.0 + secs)
        }
        _ => None
    }
}
