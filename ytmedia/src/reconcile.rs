//! Turns what yt-dlp reports back into a [`DownloadResult`] pointing at the
//! file that actually landed on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use yt_dlp::{Container, Extraction, VideoInfo};

use crate::capability::Dependency;
use crate::error::{Error, Result};
use crate::models::{Advisory, DownloadResult};

/// Height label such as `1080p`.
///
/// Portrait videos report width and height swapped, so the smaller side wins.
pub fn resolution_label(width: Option<u32>, height: Option<u32>) -> Option<String> {
    match (width, height) {
        (Some(w), Some(h)) => Some(format!("{}p", w.min(h))),
        (None, Some(h)) => Some(format!("{h}p")),
        _ => None
    }
}

/// Locate the output file.
///
/// The merger or the audio extractor may change the extension after yt-dlp
/// prepared the filename, so the prepared stem is tried with the target
/// extension first, then the post-processed `filepath`, then the nominal
/// `output_dir/title.ext`.
pub fn final_path(info: &VideoInfo, output_dir: &Path, container: Container) -> Result<PathBuf> {
    let prepared = info
        .prepared_filename
        .as_deref()
        .or(info.filename.as_deref())
        .map(|name| Path::new(name).with_extension(container.as_str()));

    let path = match prepared {
        Some(candidate) if candidate.is_file() => candidate,
        _ => match info.filepath.as_deref().map(PathBuf::from) {
            Some(reported) if reported.is_file() => reported,
            _ => {
                let nominal = output_dir.join(format!("{}.{}", info.title, container.as_str()));
                tracing::warn!(
                    path = %nominal.display(),
                    "could not verify output file, falling back to the nominal path"
                );
                nominal
            }
        }
    };

    Ok(std::path::absolute(path)?)
}

pub fn build_result(
    info: &VideoInfo,
    path: PathBuf,
    url: &str,
    container: Container,
    advisories: Vec<Advisory>
) -> DownloadResult {
    let (resolution, video_codec, audio_codec) = if container.is_audio() {
        (None, None, Some(container.as_str().to_string()))
    } else {
        (
            resolution_label(info.width, info.height),
            info.video_codec().map(str::to_string),
            info.audio_codec().map(str::to_string)
        )
    };

    DownloadResult {
        path,
        title: info.title.clone(),
        url: url.to_string(),
        resolution,
        video_codec,
        audio_codec,
        filesize: info.estimated_size(),
        advisories
    }
}

/// Map an engine failure onto the caller facing error taxonomy.
pub fn classify_failure(url: &str, err: yt_dlp::Error) -> Error {
    match err {
        yt_dlp::Error::PostProcessingFailed(reason) => Error::MergeError {
            url: url.to_string(),
            reason
        },
        yt_dlp::Error::ExecutionFailed(ref io) if io.kind() == ErrorKind::NotFound => {
            Error::dependency_missing(Dependency::YtDlp, "yt-dlp could not be started.")
        }
        yt_dlp::Error::BinaryNotExecutable(ref path) => Error::dependency_missing(
            Dependency::YtDlp,
            format!("{} is not executable.", path.display())
        ),
        other => Error::download_failed(url, other.to_string())
    }
}

pub fn reconcile_video(
    info: &VideoInfo,
    output_dir: &Path,
    url: &str,
    container: Container,
    advisories: Vec<Advisory>
) -> Result<DownloadResult> {
    let path = final_path(info, output_dir, container)?;
    let result = build_result(info, path, url, container, advisories);
    tracing::info!(title = %result.title, path = %result.path.display(), "download complete");
    Ok(result)
}

/// Reconcile the outcome of a single download.
///
/// When yt-dlp resolved the URL to a playlist, the first entry it produced is
/// used and reported under its own page URL.
pub fn reconcile(
    outcome: yt_dlp::Result<Extraction>,
    output_dir: &Path,
    url: &str,
    container: Container,
    advisories: Vec<Advisory>
) -> Result<DownloadResult> {
    match outcome.map_err(|e| classify_failure(url, e))? {
        Extraction::Video(info) => reconcile_video(&info, output_dir, url, container, advisories),
        Extraction::Playlist(playlist) => {
            let info = playlist
                .first_video()
                .ok_or_else(|| Error::download_failed(url, "no entry of the playlist could be downloaded"))?;
            let url = info.source_url().unwrap_or(url);
            reconcile_video(info, output_dir, url, container, advisories)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(json: &str) -> VideoInfo {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_resolution_label() {
        assert_eq!(resolution_label(Some(1080), Some(1920)).as_deref(), Some("1080p"));
        assert_eq!(resolution_label(Some(1920), Some(1080)).as_deref(), Some("1080p"));
        assert_eq!(resolution_label(None, Some(720)).as_deref(), Some("720p"));
        assert_eq!(resolution_label(Some(1280), None), None);
        assert_eq!(resolution_label(None, None), None);
    }

    #[test]
    fn test_final_path_prefers_rewritten_extension() {
        let dir = tempfile::tempdir().unwrap();
        let merged = dir.path().join("My Clip.mp4");
        std::fs::write(&merged, b"mp4").unwrap();
        let prepared = dir.path().join("My Clip.webm");
        let info = video(&format!(
            r#"{{"id":"a","title":"My Clip","_filename":{:?}}}"#,
            prepared.to_string_lossy()
        ));

        let path = final_path(&info, dir.path(), Container::Mp4).unwrap();
        assert_eq!(path, merged);
    }

    #[test]
    fn test_final_path_uses_reported_filepath() {
        let dir = tempfile::tempdir().unwrap();
        let actual = dir.path().join("renamed.mp3");
        std::fs::write(&actual, b"id3").unwrap();
        let info = video(&format!(
            r#"{{"id":"a","title":"Song","_filename":"/nowhere/Song.webm","filepath":{:?}}}"#,
            actual.to_string_lossy()
        ));

        assert_eq!(final_path(&info, dir.path(), Container::Mp3).unwrap(), actual);
    }

    #[test]
    fn test_final_path_nominal_fallback_is_absolute() {
        let info = video(r#"{"id":"a","title":"Ghost"}"#);
        let path = final_path(&info, Path::new("relative/out"), Container::Mp4).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("relative/out/Ghost.mp4"));
    }

    #[test]
    fn test_build_result_for_audio() {
        let info = video(r#"{"id":"a","title":"Song","width":640,"height":360,"vcodec":"avc1","acodec":"opus","filesize_approx":42}"#);
        let result = build_result(&info, PathBuf::from("/x/Song.mp3"), "https://e/a", Container::Mp3, Vec::new());
        assert_eq!(result.resolution, None);
        assert_eq!(result.video_codec, None);
        assert_eq!(result.audio_codec.as_deref(), Some("mp3"));
        assert_eq!(result.filesize, Some(42));
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure("u", yt_dlp::Error::PostProcessingFailed("Conversion failed!".into()));
        assert!(matches!(err, Error::MergeError { .. }));

        let err = classify_failure("u", yt_dlp::Error::ExtractionFailed {
            code: 1,
            message: "Video unavailable".into()
        });
        assert!(matches!(err, Error::DownloadFailed { ref url, .. } if url == "u"));

        let io = std::io::Error::new(ErrorKind::NotFound, "no such file");
        let err = classify_failure("u", yt_dlp::Error::ExecutionFailed(io));
        assert!(matches!(err, Error::DependencyMissing { dependency: Dependency::YtDlp, .. }));
    }

    #[test]
    fn test_reconcile_playlist_without_entries_fails() {
        let outcome = Extraction::from_json(r#"{"_type":"playlist","id":"p","entries":[null]}"#);
        let err = reconcile(outcome, Path::new("out"), "u", Container::Mp4, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DownloadFailed { .. }));
    }

    #[test]
    fn test_reconcile_playlist_uses_entry_url() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("B.mp4"), b"mp4").unwrap();
        let doc = format!(
            r#"{{"_type":"playlist","id":"p","entries":[null,
                {{"id":"b","title":"B","webpage_url":"https://e/watch?v=b","_filename":"{}"}}]}}"#,
            dir.path().join("B.webm").display()
        );
        let outcome = Extraction::from_json(&doc);
        let result = reconcile(outcome, dir.path(), "https://e/list", Container::Mp4, Vec::new()).unwrap();
        assert_eq!(result.url, "https://e/watch?v=b");
        assert_eq!(result.path, dir.path().join("B.mp4"));
    }
}
