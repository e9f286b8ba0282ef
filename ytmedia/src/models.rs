use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;
use yt_dlp::VideoInfo;

use crate::error::Error;

/// Requested video height: `best` or a positive pixel height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionTarget {
    #[default]
    Best,
    Height(NonZeroU32)
}

impl ResolutionTarget {
    pub fn max_height(self) -> Option<u32> {
        match self {
            ResolutionTarget::Best => None,
            ResolutionTarget::Height(h) => Some(h.get())
        }
    }
}

impl FromStr for ResolutionTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("best") {
            return Ok(ResolutionTarget::Best);
        }
        let digits = value.strip_suffix(['p', 'P']).unwrap_or(value);
        match digits.parse::<i64>() {
            Ok(height) if height > 0 => u32::try_from(height)
                .ok()
                .and_then(NonZeroU32::new)
                .map(ResolutionTarget::Height)
                .ok_or_else(|| Error::InvalidParameter(format!("resolution {height} is out of range"))),
            Ok(height) => Err(Error::InvalidParameter(format!(
                "resolution must be positive, got {height}"
            ))),
            Err(_) => Err(Error::InvalidParameter(format!(
                "resolution must be 'best' or a height like 1080, got {value:?}"
            )))
        }
    }
}

impl fmt::Display for ResolutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionTarget::Best => f.write_str("best"),
            ResolutionTarget::Height(h) => write!(f, "{h}")
        }
    }
}

/// Audio bitrate handed to the extractor as-is, e.g. `320` or `192K`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioQuality(String);

impl AudioQuality {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AudioQuality {
    fn default() -> Self {
        AudioQuality("320".to_string())
    }
}

impl FromStr for AudioQuality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(Error::InvalidParameter("audio quality must not be empty".to_string()));
        }
        Ok(AudioQuality(value.to_string()))
    }
}

impl From<u32> for AudioQuality {
    fn from(kbps: u32) -> Self {
        AudioQuality(kbps.to_string())
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-fatal notice about how a request had to be degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// No muxer: limited to single pre-muxed streams, audio can't be chosen independently.
    PreMuxedOnly,
    /// Audio exclusion was requested but stripping audio needs the muxer.
    AudioIgnored
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::PreMuxedOnly => f.write_str(
                "ffmpeg not found: using the best single pre-muxed stream (may be limited to 720p or lower)"
            ),
            Advisory::AudioIgnored => {
                f.write_str("audio will be ignored: ffmpeg is required to strip the audio track")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub resolution: ResolutionTarget,
    pub include_audio: bool,
    pub allow_playlist: bool,
    pub debug: bool
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_dir: PathBuf::from("downloads"),
            resolution: ResolutionTarget::Best,
            include_audio: true,
            allow_playlist: false,
            debug: false
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn resolution(mut self, resolution: ResolutionTarget) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn include_audio(mut self, include: bool) -> Self {
        self.include_audio = include;
        self
    }

    pub fn allow_playlist(mut self, allow: bool) -> Self {
        self.allow_playlist = allow;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub title: String,
    pub url: String,
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub filesize: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Advisory>
}

impl fmt::Display for DownloadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' -> {}", self.title, self.path.display())?;
        if let Some(ref resolution) = self.resolution {
            write!(f, " [{resolution}]")?;
        }
        if let Some(ref codec) = self.audio_codec {
            write!(f, " audio={codec}")?;
        }
        Ok(())
    }
}

/// Opaque identifier of a playlist entry that produced no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailureMarker(String);

impl FailureMarker {
    pub fn for_index(index: u32) -> Self {
        Self::for_path(&[index])
    }

    /// Marker for an entry of a nested playlist, such as `#2.5` for the fifth
    /// video of a channel's second tab.
    pub fn for_path(indices: &[u32]) -> Self {
        let path = indices.iter().map(u32::to_string).collect::<Vec<_>>().join(".");
        FailureMarker(format!("#{path}"))
    }
}

impl fmt::Display for FailureMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaylistResult {
    pub downloads: Vec<DownloadResult>,
    pub failed: Vec<FailureMarker>,
    pub total: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Advisory>
}

impl PlaylistResult {
    pub fn success_count(&self) -> usize {
        self.downloads.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

impl fmt::Display for PlaylistResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaylistResult({}/{} downloaded, {} failed)",
            self.success_count(),
            self.total,
            self.failed_count()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub id: String,
    pub title: String,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub duration_string: Option<String>,
    pub view_count: Option<u64>,
    pub webpage_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub format_count: usize,
    pub best_height: Option<u32>
}

impl From<&VideoInfo> for MetadataRecord {
    fn from(info: &VideoInfo) -> Self {
        Self {
            id: info.id.clone(),
            title: info.title.clone(),
            uploader: info.uploader.clone().or_else(|| info.channel.clone()),
            duration: info.duration,
            duration_string: info.duration_string.clone(),
            view_count: info.view_count,
            webpage_url: info.webpage_url.clone(),
            width: info.width,
            height: info.height,
            resolution: crate::reconcile::resolution_label(info.width, info.height),
            video_codec: info.video_codec().map(str::to_string),
            audio_codec: info.audio_codec().map(str::to_string),
            format_count: info.formats.len(),
            best_height: info
                .formats
                .iter()
                .filter(|f| f.has_video())
                .filter_map(|f| f.height)
                .max()
        }
    }
}

impl fmt::Display for MetadataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title    : {}", self.title)?;
        if let Some(ref uploader) = self.uploader {
            writeln!(f, "Uploader : {uploader}")?;
        }
        match (&self.duration_string, self.duration) {
            (Some(text), _) => writeln!(f, "Duration : {text}")?,
            (None, Some(secs)) => writeln!(f, "Duration : {secs}s")?,
            (None, None) => {}
        }
        if let Some(views) = self.view_count {
            writeln!(f, "Views    : {views}")?;
        }
        if let Some(ref resolution) = self.resolution {
            writeln!(f, "Quality  : {resolution}")?;
        }
        if let Some(ref url) = self.webpage_url {
            writeln!(f, "URL      : {url}")?;
        }
        write!(f, "\nAvailable formats: {}", self.format_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_target_parse() {
        assert_eq!("best".parse::<ResolutionTarget>().unwrap(), ResolutionTarget::Best);
        assert_eq!(" BEST ".parse::<ResolutionTarget>().unwrap(), ResolutionTarget::Best);
        assert_eq!("720".parse::<ResolutionTarget>().unwrap().max_height(), Some(720));
        assert_eq!("1080p".parse::<ResolutionTarget>().unwrap().max_height(), Some(1080));
    }

    #[test]
    fn test_resolution_target_rejects_non_positive() {
        for input in ["0", "-720", "abc", "", "99999999999"] {
            let err = input.parse::<ResolutionTarget>().unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)), "{input} should be rejected");
        }
    }

    #[test]
    fn test_audio_quality() {
        assert_eq!("192".parse::<AudioQuality>().unwrap().as_str(), "192");
        assert_eq!(AudioQuality::from(128).as_str(), "128");
        assert_eq!(AudioQuality::default().as_str(), "320");
        assert!(matches!("  ".parse::<AudioQuality>(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_playlist_result_display() {
        let result = PlaylistResult {
            downloads: Vec::new(),
            failed: vec![FailureMarker::for_index(2)],
            total: 3,
            advisories: Vec::new()
        };
        assert_eq!(result.to_string(), "PlaylistResult(0/3 downloaded, 1 failed)");
        assert_eq!(result.failed[0].to_string(), "#2");
        assert_eq!(FailureMarker::for_path(&[1, 3]).to_string(), "#1.3");
    }

    #[test]
    fn test_download_result_display() {
        let result = DownloadResult {
            path: PathBuf::from("/tmp/Clip.mp4"),
            title: "Clip".to_string(),
            url: "https://example.com/clip".to_string(),
            resolution: Some("1080p".to_string()),
            video_codec: Some("avc1".to_string()),
            audio_codec: Some("aac".to_string()),
            filesize: None,
            advisories: Vec::new()
        };
        assert_eq!(result.to_string(), "'Clip' -> /tmp/Clip.mp4 [1080p] audio=aac");
    }

    #[test]
    fn test_metadata_record_from_info() {
        let info: VideoInfo = serde_json::from_str(
            r#"{"id":"a","title":"A","channel":"Chan","width":1920,"height":1080,
                "vcodec":"vp9","acodec":"opus","duration_string":"3:21",
                "formats":[
                    {"format_id":"18","height":360,"vcodec":"avc1","acodec":"mp4a"},
                    {"format_id":"137","height":1080,"vcodec":"avc1","acodec":"none"},
                    {"format_id":"140","vcodec":"none","acodec":"mp4a"}
                ]}"#
        )
        .unwrap();
        let record = MetadataRecord::from(&info);
        assert_eq!(record.uploader.as_deref(), Some("Chan"));
        assert_eq!(record.resolution.as_deref(), Some("1080p"));
        assert_eq!(record.format_count, 3);
        assert_eq!(record.best_height, Some(1080));
        assert!(record.to_string().contains("Available formats: 3"));
    }
}
