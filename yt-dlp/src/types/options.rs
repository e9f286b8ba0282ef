use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Mp4,
    Mp3
}

impl Container {
    pub fn as_str(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mp3 => "mp3"
        }
    }

    pub fn is_audio(self) -> bool {
        matches!(self, Container::Mp3)
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments handed to one of yt-dlp's post-processors, e.g. the merger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostprocessorArgs {
    pub processor: String,
    pub args: Vec<String>
}

impl PostprocessorArgs {
    pub fn new(processor: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            processor: processor.into(),
            args: args.into_iter().map(Into::into).collect()
        }
    }

    pub fn as_arg(&self) -> String {
        format!("{}:{}", self.processor, self.args.join(" "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub format: Option<String>,
    pub merge_output_format: Option<Container>,
    pub output_template: Option<String>,
    pub extract_audio: bool,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
    pub postprocessor_args: Vec<PostprocessorArgs>,
    pub allow_playlist: bool,
    pub ignore_errors: bool,
    pub verbose: bool,
    pub js_runtimes: Vec<(String, PathBuf)>
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn merge_output_format(mut self, container: Container) -> Self {
        self.merge_output_format = Some(container);
        self
    }

    pub fn output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = Some(template.into());
        self
    }

    pub fn extract_audio(mut self, extract: bool) -> Self {
        self.extract_audio = extract;
        self
    }

    pub fn audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = Some(format.into());
        self
    }

    pub fn audio_quality(mut self, quality: impl Into<String>) -> Self {
        self.audio_quality = Some(quality.into());
        self
    }

    pub fn postprocessor_args(mut self, args: PostprocessorArgs) -> Self {
        self.postprocessor_args.push(args);
        self
    }

    pub fn allow_playlist(mut self, allow: bool) -> Self {
        self.allow_playlist = allow;
        self
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn js_runtime(mut self, name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        self.js_runtimes.push((name.into(), executable.into()));
        self
    }
}
