use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::types::{Container, DownloadOptions, PostprocessorArgs};

/// Progress line layout requested from yt-dlp; parsed by `parse_template_progress`.
pub const PROGRESS_TEMPLATE: &str = "download:[progress] %(progress._percent_str)s %(progress._total_bytes_str)s \
    %(progress._speed_str)s %(progress._eta_str)s %(info.vcodec)s %(info.acodec)s";

pub struct CommandBuilder {
    binary: PathBuf,
    args: Vec<String>
}

impl CommandBuilder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn url(self, url: impl Into<String>) -> Self {
        self.arg("--").arg(url)
    }

    pub fn json_output(self) -> Self {
        self.arg("--dump-json")
    }

    /// Print one JSON document for the whole run once post-processing is done.
    pub fn single_json_output(self) -> Self {
        self.arg("--dump-single-json")
    }

    pub fn no_simulate(self) -> Self {
        self.arg("--no-simulate")
    }

    pub fn skip_download(self) -> Self {
        self.arg("--skip-download")
    }

    pub fn output(self, template: impl Into<String>) -> Self {
        self.arg("-o").arg(template)
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.arg("-f").arg(format)
    }

    pub fn extract_audio(self) -> Self {
        self.arg("-x")
    }

    pub fn audio_format(self, format: impl Into<String>) -> Self {
        self.arg("--audio-format").arg(format)
    }

    pub fn audio_quality(self, quality: impl Into<String>) -> Self {
        self.arg("--audio-quality").arg(quality)
    }

    pub fn merge_output_format(self, container: Container) -> Self {
        self.arg("--merge-output-format").arg(container.as_str())
    }

    pub fn postprocessor_args(self, args: &PostprocessorArgs) -> Self {
        self.arg("--postprocessor-args").arg(args.as_arg())
    }

    pub fn cookies_file(self, path: impl AsRef<Path>) -> Self {
        self.arg("--cookies").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn cookies_file_opt(self, path: Option<&PathBuf>) -> Self {
        match path {
            Some(p) => self.cookies_file(p),
            None => self
        }
    }

    pub fn progress_template(self, template: impl Into<String>) -> Self {
        self.arg("--progress-template").arg(template)
    }

    pub fn newline_progress(self) -> Self {
        self.arg("--newline")
    }

    /// Keep progress lines even though JSON output implies `--quiet`.
    pub fn force_progress(self) -> Self {
        self.arg("--progress")
    }

    pub fn no_warnings(self) -> Self {
        self.arg("--no-warnings")
    }

    pub fn verbose(self) -> Self {
        self.arg("--verbose")
    }

    pub fn ignore_errors(self) -> Self {
        self.arg("--ignore-errors")
    }

    pub fn yes_playlist(self) -> Self {
        self.arg("--yes-playlist")
    }

    pub fn no_playlist(self) -> Self {
        self.arg("--no-playlist")
    }

    pub fn js_runtime(self, name: &str, executable: impl AsRef<Path>) -> Self {
        self.arg("--js-runtimes")
            .arg(format!("{name}:{}", executable.as_ref().to_string_lossy()))
    }

    pub fn ffmpeg_location(self, path: impl AsRef<Path>) -> Self {
        self.arg("--ffmpeg-location").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn with_options(mut self, options: &DownloadOptions) -> Self {
        if let Some(ref format) = options.format {
            self = self.format(format.clone());
        }

        if let Some(container) = options.merge_output_format {
            self = self.merge_output_format(container);
        }

        if let Some(ref template) = options.output_template {
            self = self.output(template.clone());
        }

        if options.extract_audio {
            self = self.extract_audio();
        }

        if let Some(ref format) = options.audio_format {
            self = self.audio_format(format.clone());
        }

        if let Some(ref quality) = options.audio_quality {
            self = self.audio_quality(quality.clone());
        }

        for pp_args in &options.postprocessor_args {
            self = self.postprocessor_args(pp_args);
        }

        self = if options.allow_playlist {
            self.yes_playlist()
        } else {
            self.no_playlist()
        };

        if options.ignore_errors {
            self = self.ignore_errors();
        }

        self = if options.verbose {
            self.verbose()
        } else {
            self.no_warnings()
        };

        for (name, executable) in &options.js_runtimes {
            self = self.js_runtime(name, executable);
        }

        self
    }

    pub fn build_with_env(&self, env_vars: &HashMap<String, String>) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.args);

        if let Some(path_prepend) = env_vars.get("PATH_PREPEND") {
            let current_path = std::env::var_os("PATH").unwrap_or_default();
            let paths = std::iter::once(PathBuf::from(path_prepend))
                .chain(std::env::split_paths(&current_path));
            if let Ok(joined) = std::env::join_paths(paths) {
                cmd.env("PATH", joined);
            }
        }

        for (key, value) in env_vars {
            if key != "PATH_PREPEND" {
                cmd.env(key, value);
            }
        }

        cmd
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }
}
