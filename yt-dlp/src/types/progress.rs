use super::video_info::Extraction;

/// Which kind of stream a progress line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamKind {
    Video,
    Audio,
    Combined,
    #[default]
    Unknown
}

impl StreamKind {
    pub fn from_codecs(vcodec: Option<&str>, acodec: Option<&str>) -> Self {
        let present = |c: Option<&str>| c.is_some_and(|c| c != "none" && c != "NA");
        match (present(vcodec), present(acodec)) {
            (true, true) => StreamKind::Combined,
            (true, false) => StreamKind::Video,
            (false, true) => StreamKind::Audio,
            (false, false) => StreamKind::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamKind::Video => "[video]",
            StreamKind::Audio => "[audio]",
            StreamKind::Combined | StreamKind::Unknown => "[download]"
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadProgress {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub speed: Option<f64>,
    pub eta: Option<f64>,
    pub percent: Option<f64>,
    pub stream: StreamKind
}

impl DownloadProgress {
    pub fn format_speed(&self) -> Option<String> {
        self.speed.map(|s| {
            if s >= 1_000_000.0 {
                format!("{:.2} MB/s", s / 1_000_000.0)
            } else if s >= 1_000.0 {
                format!("{:.2} KB/s", s / 1_000.0)
            } else {
                format!("{s:.0} B/s")
            }
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn format_eta(&self) -> Option<String> {
        self.eta.map(|e| {
            let secs = e as u64;
            let mins = secs / 60;
            let hours = mins / 60;
            if hours > 0 {
                format!("{}:{:02}:{:02}", hours, mins % 60, secs % 60)
            } else {
                format!("{}:{:02}", mins, secs % 60)
            }
        })
    }

    pub fn format_total(&self) -> Option<String> {
        self.total_bytes.map(format_bytes)
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.2} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.2} MB", bytes as f64 / 1_000_000.0)
    } else if bytes >= 1_000 {
        format!("{:.2} KB", bytes as f64 / 1_000.0)
    } else {
        format!("{bytes} B")
    }
}

#[derive(Debug, Clone)]
pub enum DownloadEvent {
    Extracting { url: String },
    DownloadStarted { filename: String },
    Progress(DownloadProgress),
    PostProcessing { status: String },
    MergingFormats,
    Finished { filename: String },
    Error { message: String },
    Warning { message: String },
    /// Final info document printed by yt-dlp once every post-processor ran.
    Extracted(Box<Extraction>)
}
