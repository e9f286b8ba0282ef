use std::path::PathBuf;

use clap::Args;
use yt_dlp::YtDlp;

use crate::capability::ToolOverrides;

/// Tool locations and engine tweaks, from flags or the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct Settings {
    /// Path to the yt-dlp executable
    #[arg(long = "ytdlp-path", env = "YTMEDIA_YTDLP_PATH", global = true)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable
    #[arg(long = "ffmpeg-path", env = "YTMEDIA_FFMPEG_PATH", global = true)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to the deno executable used for YouTube's JS challenges
    #[arg(long = "deno-path", env = "YTMEDIA_DENO_PATH", global = true)]
    pub deno_path: Option<PathBuf>,

    /// Netscape formatted cookies file
    #[arg(long, env = "YTMEDIA_COOKIES", global = true)]
    pub cookies: Option<PathBuf>,

    /// Extractor arguments, one per line or separated by ';'
    #[arg(long = "extractor-args", env = "YTMEDIA_EXTRACTOR_ARGS", global = true)]
    pub extractor_args: Option<String>
}

impl Settings {
    pub fn overrides(&self) -> ToolOverrides {
        ToolOverrides {
            ytdlp: self.ytdlp_path.clone(),
            ffmpeg: self.ffmpeg_path.clone(),
            deno: self.deno_path.clone()
        }
    }

    pub fn client(&self) -> YtDlp {
        let mut yt_dlp = match self.ytdlp_path {
            Some(ref path) => {
                tracing::info!("Using custom yt-dlp path: {}", path.display());
                YtDlp::with_binary(path)
            }
            None => YtDlp::new()
        };

        if let Some(ref cookies) = self.cookies {
            if cookies.exists() {
                yt_dlp.set_cookies_file(Some(cookies.clone()));
                tracing::info!("Using cookies file: {}", cookies.display());
            } else {
                tracing::warn!("Cookies file {} does not exist, ignoring", cookies.display());
            }
        }

        if let Some(ref ffmpeg) = self.ffmpeg_path {
            yt_dlp.set_ffmpeg_location(Some(ffmpeg.clone()));
            tracing::info!("Using custom ffmpeg path: {}", ffmpeg.display());
        }

        if let Some(ref deno) = self.deno_path
            && let Some(parent) = deno.parent()
        {
            yt_dlp.set_env("PATH_PREPEND".to_string(), parent.to_string_lossy().to_string());
            tracing::info!("Using custom deno path: {}", deno.display());
        }

        if let Some(ref input) = self.extractor_args {
            yt_dlp.set_extra_args(parse_extractor_args(input));
        }

        yt_dlp
    }
}

/// Join extractor arguments into a single `--extractor-args` flag.
pub fn parse_extractor_args(input: &str) -> Vec<String> {
    let joined: Vec<&str> = input
        .split(['\n', ';'])
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if joined.is_empty() {
        return Vec::new();
    }
    vec![
        "--extractor-args".to_string(),
        joined.join(";")
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extractor_args_lines() {
        let input = "youtube:player-client=default,mweb\nyoutubepot-bgutilhttp:base_url=http://bgutil:4416";
        assert_eq!(parse_extractor_args(input), vec![
            "--extractor-args",
            "youtube:player-client=default,mweb;youtubepot-bgutilhttp:base_url=http://bgutil:4416"
        ]);
    }

    #[test]
    fn test_parse_extractor_args_semicolons() {
        let input = "  youtube:player-client=mweb ;; youtube:po_token=abc \r\n";
        assert_eq!(parse_extractor_args(input), vec![
            "--extractor-args",
            "youtube:player-client=mweb;youtube:po_token=abc"
        ]);
    }

    #[test]
    fn test_parse_extractor_args_empty() {
        assert!(parse_extractor_args("").is_empty());
        assert!(parse_extractor_args("  \n ; \n  ").is_empty());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings {
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            ..Settings::default()
        };
        let overrides = settings.overrides();
        assert_eq!(overrides.ffmpeg, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert!(overrides.ytdlp.is_none());
    }

    #[test]
    fn test_client_uses_custom_binary() {
        let settings = Settings {
            ytdlp_path: Some(PathBuf::from("/opt/yt-dlp")),
            cookies: Some(PathBuf::from("/definitely/missing/cookies.txt")),
            ..Settings::default()
        };
        let client = settings.client();
        assert_eq!(client.binary(), &PathBuf::from("/opt/yt-dlp"));
    }
}
