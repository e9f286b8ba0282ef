use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub duration_string: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
    #[serde(default)]
    pub playlist_index: Option<u32>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    /// Output name yt-dlp prepared from the template, before post-processing.
    #[serde(rename = "_filename", default)]
    pub prepared_filename: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Final path after every post-processor moved or rewrote the file.
    #[serde(default)]
    pub filepath: Option<String>
}

impl VideoInfo {
    pub fn estimated_size(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    pub fn source_url(&self) -> Option<&str> {
        self.webpage_url
            .as_deref()
            .or(self.original_url.as_deref())
    }

    /// Codec reported by yt-dlp, with its `"none"` placeholder mapped to `None`.
    pub fn video_codec(&self) -> Option<&str> {
        self.vcodec.as_deref().filter(|c| *c != "none")
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.acodec.as_deref().filter(|c| *c != "none")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub format_id: String,
    #[serde(default)]
    pub format_note: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>
}

impl Format {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_ref().is_some_and(|v| v != "none")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    /// One slot per processed entry; `None` where yt-dlp gave up on it.
    ///
    /// Channels nest their tabs as playlists inside the outer playlist.
    #[serde(default)]
    pub entries: Vec<Option<Extraction>>,
    /// 1-based playlist indices yt-dlp attempted.
    #[serde(default)]
    pub requested_entries: Vec<u32>,
    #[serde(default)]
    pub playlist_count: Option<u32>
}

impl PlaylistInfo {
    /// First resolved video, searching nested playlists depth first.
    pub fn first_video(&self) -> Option<&VideoInfo> {
        self.entries.iter().flatten().find_map(|entry| match entry {
            Extraction::Video(info) => Some(info.as_ref()),
            Extraction::Playlist(nested) => nested.first_video()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    Video(Box<VideoInfo>),
    Playlist(PlaylistInfo)
}

impl Extraction {
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn from_slice(document: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(document)?)
    }

    fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        let is_playlist = matches!(
            value.get("_type").and_then(serde_json::Value::as_str),
            Some("playlist" | "multi_video")
        );
        if is_playlist {
            Ok(Extraction::Playlist(serde_json::from_value(value)?))
        } else {
            Ok(Extraction::Video(Box::new(serde_json::from_value(value)?)))
        }
    }
}

impl<'de> Deserialize<'de> for Extraction {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Extraction::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_video() {
        let doc = r#"{"id":"abc","title":"Clip","width":1920,"height":1080,
            "vcodec":"avc1.640028","acodec":"none","filesize_approx":1234,
            "_filename":"/tmp/out/Clip.webm"}"#;
        let Extraction::Video(info) = Extraction::from_json(doc).unwrap() else {
            panic!("expected a video");
        };
        assert_eq!(info.title, "Clip");
        assert_eq!(info.prepared_filename.as_deref(), Some("/tmp/out/Clip.webm"));
        assert_eq!(info.estimated_size(), Some(1234));
        assert_eq!(info.video_codec(), Some("avc1.640028"));
        assert_eq!(info.audio_codec(), None);
    }

    #[test]
    fn test_extraction_playlist_with_null_entries() {
        let doc = r#"{"_type":"playlist","id":"PL1","title":"Mix",
            "entries":[{"id":"a","title":"A","playlist_index":1},null],
            "requested_entries":[1,2,3]}"#;
        let Extraction::Playlist(info) = Extraction::from_json(doc).unwrap() else {
            panic!("expected a playlist");
        };
        assert_eq!(info.entries.len(), 2);
        assert!(matches!(info.entries[0], Some(Extraction::Video(_))));
        assert!(info.entries[1].is_none());
        assert_eq!(info.requested_entries, vec![1, 2, 3]);
    }

    #[test]
    fn test_extraction_nested_playlists() {
        let doc = r#"{"_type":"playlist","id":"UC1","title":"Channel",
            "entries":[
                {"_type":"playlist","id":"UC1-videos","entries":[null,{"id":"b","title":"B"}]},
                {"_type":"playlist","id":"UC1-shorts","entries":[{"id":"s","title":"S"}]}
            ]}"#;
        let Extraction::Playlist(info) = Extraction::from_json(doc).unwrap() else {
            panic!("expected a playlist");
        };
        let Some(Extraction::Playlist(videos)) = &info.entries[0] else {
            panic!("expected a nested playlist");
        };
        assert_eq!(videos.id, "UC1-videos");
        assert_eq!(videos.entries.len(), 2);
        assert_eq!(info.first_video().map(|v| v.id.as_str()), Some("b"));
    }

    #[test]
    fn test_extraction_invalid_json() {
        assert!(Extraction::from_json("not json").is_err());
        assert!(Extraction::from_slice(b"{\"id\":\xe9}").is_err());
    }

    #[test]
    fn test_source_url_fallback() {
        let doc = r#"{"id":"a","title":"A","original_url":"https://example.com/a"}"#;
        let Extraction::Video(info) = Extraction::from_json(doc).unwrap() else {
            panic!("expected a video");
        };
        assert_eq!(info.source_url(), Some("https://example.com/a"));
    }
}
