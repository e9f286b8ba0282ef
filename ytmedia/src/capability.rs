//! Detection of the external tools the pipeline drives.
//!
//! Lookups are memoized for the lifetime of a [`Capabilities`] value and only
//! redone after [`Capabilities::invalidate`], e.g. once a tool was installed.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dependency {
    YtDlp,
    Ffmpeg,
    JsRuntime
}

impl Dependency {
    pub fn name(self) -> &'static str {
        match self {
            Dependency::YtDlp => "yt-dlp",
            Dependency::Ffmpeg => "ffmpeg",
            Dependency::JsRuntime => "nodejs"
        }
    }

    /// Platform specific instructions for installing the tool.
    pub fn install_hint(self) -> &'static str {
        match self {
            Dependency::YtDlp => {
                "Install yt-dlp: pip install -U yt-dlp (or see https://github.com/yt-dlp/yt-dlp#installation)"
            }
            Dependency::Ffmpeg => ffmpeg_hint(),
            Dependency::JsRuntime => {
                "Install Node.js from https://nodejs.org (recommended) or Deno from https://deno.com"
            }
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn ffmpeg_hint() -> &'static str {
    if cfg!(target_os = "windows") {
        "Install ffmpeg: winget install ffmpeg (or https://www.gyan.dev/ffmpeg/builds/)"
    } else if cfg!(target_os = "macos") {
        "Install ffmpeg: brew install ffmpeg"
    } else {
        "Install ffmpeg: sudo apt install ffmpeg (Debian/Ubuntu), sudo dnf install ffmpeg (Fedora) \
         or sudo pacman -S ffmpeg (Arch)"
    }
}

/// Explicitly configured tool locations; empty fields fall back to `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub ytdlp: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
    pub deno: Option<PathBuf>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsRuntime {
    pub name: &'static str,
    pub executable: PathBuf
}

#[derive(Debug, Default)]
pub struct Capabilities {
    overrides: ToolOverrides,
    ytdlp: OnceLock<Option<PathBuf>>,
    ffmpeg: OnceLock<Option<PathBuf>>,
    js_runtimes: OnceLock<Vec<JsRuntime>>
}

impl Capabilities {
    pub fn new(overrides: ToolOverrides) -> Self {
        Self {
            overrides,
            ..Self::default()
        }
    }

    /// Capabilities with fixed answers and no probing until invalidated.
    pub fn preset(ytdlp: Option<PathBuf>, ffmpeg: Option<PathBuf>, js_runtimes: Vec<JsRuntime>) -> Self {
        Self {
            overrides: ToolOverrides::default(),
            ytdlp: OnceLock::from(ytdlp),
            ffmpeg: OnceLock::from(ffmpeg),
            js_runtimes: OnceLock::from(js_runtimes)
        }
    }

    pub fn ytdlp(&self) -> Option<&Path> {
        self.ytdlp
            .get_or_init(|| locate(self.overrides.ytdlp.as_deref(), &["yt-dlp"]))
            .as_deref()
    }

    pub fn ffmpeg(&self) -> Option<&Path> {
        self.ffmpeg
            .get_or_init(|| locate(self.overrides.ffmpeg.as_deref(), &["ffmpeg"]))
            .as_deref()
    }

    pub fn has_ffmpeg(&self) -> bool {
        self.ffmpeg().is_some()
    }

    /// Node first, then deno.
    pub fn js_runtimes(&self) -> &[JsRuntime] {
        self.js_runtimes.get_or_init(|| {
            let mut runtimes = Vec::new();
            if let Some(executable) = locate(None, &["node"]) {
                runtimes.push(JsRuntime {
                    name: "node",
                    executable
                });
            }
            if let Some(executable) = locate(self.overrides.deno.as_deref(), &["deno"]) {
                runtimes.push(JsRuntime {
                    name: "deno",
                    executable
                });
            }
            runtimes
        })
    }

    pub fn has_js_runtime(&self) -> bool {
        !self.js_runtimes().is_empty()
    }

    pub fn missing_dependencies(&self) -> Vec<Dependency> {
        let mut missing = Vec::new();
        if self.ytdlp().is_none() {
            missing.push(Dependency::YtDlp);
        }
        if !self.has_ffmpeg() {
            missing.push(Dependency::Ffmpeg);
        }
        if !self.has_js_runtime() {
            missing.push(Dependency::JsRuntime);
        }
        missing
    }

    /// Fails with [`Error::DependencyMissing`] when `dependency` is absent.
    pub fn require(&self, dependency: Dependency, purpose: &str) -> Result<()> {
        let present = match dependency {
            Dependency::YtDlp => self.ytdlp().is_some(),
            Dependency::Ffmpeg => self.has_ffmpeg(),
            Dependency::JsRuntime => self.has_js_runtime()
        };
        if present {
            Ok(())
        } else {
            Err(Error::dependency_missing(
                dependency,
                format!("{dependency} is required for {purpose}.")
            ))
        }
    }

    /// Forget every memoized lookup so the next query probes again.
    pub fn invalidate(&mut self) {
        self.ytdlp = OnceLock::new();
        self.ffmpeg = OnceLock::new();
        self.js_runtimes = OnceLock::new();
        tracing::debug!("capability cache cleared");
    }
}

fn locate(configured: Option<&Path>, names: &[&str]) -> Option<PathBuf> {
    if let Some(path) = configured {
        return match which::which(path) {
            Ok(found) => Some(found),
            Err(e) => {
                tracing::warn!("configured tool {} is not usable: {}", path.display(), e);
                None
            }
        };
    }

    let found = names.iter().find_map(|name| which::which(name).ok());
    tracing::debug!(tools = ?names, found = ?found, "probed PATH");
    found
}
