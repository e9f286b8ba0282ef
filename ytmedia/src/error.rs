use crate::capability::Dependency;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("missing dependency: {dependency}. {message}\n{hint}", hint = .dependency.install_hint())]
    DependencyMissing {
        dependency: Dependency,
        message: String
    },

    #[error("download failed for {url:?}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("merge step failed for {url:?} (downloaded streams were kept): {reason}")]
    MergeError { url: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl Error {
    pub fn dependency_missing(dependency: Dependency, message: impl Into<String>) -> Self {
        Error::DependencyMissing {
            dependency,
            message: message.into()
        }
    }

    pub fn download_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::DownloadFailed {
            url: url.into(),
            reason: reason.into()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_missing_suggests_install() {
        let err = Error::dependency_missing(Dependency::Ffmpeg, "ffmpeg is required for MP3 conversion.");
        let text = err.to_string();
        assert!(text.starts_with("missing dependency: ffmpeg."));
        assert!(text.contains("install"));
    }

    #[test]
    fn test_download_failed_carries_url() {
        let err = Error::download_failed("https://example.com/v", "Video unavailable");
        assert!(matches!(err, Error::DownloadFailed { ref url, .. } if url == "https://example.com/v"));
        assert!(err.to_string().contains("Video unavailable"));
    }
}
