use std::path::{Path, PathBuf};

use yt_dlp::{Container, DownloadOptions, PostprocessorArgs};

use crate::capability::JsRuntime;
use crate::error::Result;
use crate::models::AudioQuality;
use crate::selector::StreamSelector;

/// Video is copied as-is, audio is re-encoded to AAC so every MP4 player accepts it.
const MERGE_CODEC_ARGS: [&str; 4] = ["-c:v", "copy", "-c:a", "aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// One updating progress line per stream.
    #[default]
    Condensed,
    /// Full engine output, no progress rendering.
    Diagnostic
}

impl Verbosity {
    pub fn from_debug(debug: bool) -> Self {
        if debug { Verbosity::Diagnostic } else { Verbosity::Condensed }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postprocess {
    None,
    MergeCodecs(PostprocessorArgs),
    ExtractAudio { quality: AudioQuality }
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub audio_quality: Option<AudioQuality>,
    pub allow_playlist: bool,
    pub ignore_errors: bool,
    pub verbosity: Verbosity,
    pub js_runtimes: Vec<JsRuntime>
}

/// Everything the engine needs for one invocation.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub selector: StreamSelector,
    pub output_dir: PathBuf,
    pub output_template: String,
    pub container: Container,
    pub postprocess: Postprocess,
    pub allow_playlist: bool,
    pub ignore_errors: bool,
    pub verbosity: Verbosity,
    pub js_runtimes: Vec<JsRuntime>
}

/// Assemble the engine request and make sure `output_dir` exists.
///
/// An `audio_quality` in `options` turns the request into an MP3 extraction;
/// otherwise the target is MP4 and the merge codec arguments are only attached
/// when the selector merges separate streams.
pub fn build(selector: StreamSelector, output_dir: &Path, options: RequestOptions) -> Result<RequestConfig> {
    std::fs::create_dir_all(output_dir)?;

    let (container, postprocess) = match options.audio_quality {
        Some(quality) => (Container::Mp3, Postprocess::ExtractAudio { quality }),
        None if selector.requires_merge() => (
            Container::Mp4,
            Postprocess::MergeCodecs(PostprocessorArgs::new("merger", MERGE_CODEC_ARGS))
        ),
        None => (Container::Mp4, Postprocess::None)
    };

    let output_template = output_dir.join("%(title)s.%(ext)s").to_string_lossy().into_owned();
    tracing::debug!(
        format = %selector,
        template = %output_template,
        container = %container,
        "built request"
    );

    Ok(RequestConfig {
        selector,
        output_dir: output_dir.to_path_buf(),
        output_template,
        container,
        postprocess,
        allow_playlist: options.allow_playlist,
        ignore_errors: options.ignore_errors,
        verbosity: options.verbosity,
        js_runtimes: options.js_runtimes
    })
}

impl RequestConfig {
    pub fn to_options(&self) -> DownloadOptions {
        let mut options = DownloadOptions::new()
            .format(self.selector.expression())
            .output_template(self.output_template.clone())
            .allow_playlist(self.allow_playlist)
            .ignore_errors(self.ignore_errors)
            .verbose(self.verbosity == Verbosity::Diagnostic);

        match self.postprocess {
            Postprocess::ExtractAudio { ref quality } => {
                options = options
                    .extract_audio(true)
                    .audio_format(self.container.as_str())
                    .audio_quality(quality.as_str());
            }
            Postprocess::MergeCodecs(ref args) => {
                options = options
                    .merge_output_format(self.container)
                    .postprocessor_args(args.clone());
            }
            Postprocess::None => {}
        }

        for runtime in &self.js_runtimes {
            options = options.js_runtime(runtime.name, runtime.executable.clone());
        }

        options
    }
}
