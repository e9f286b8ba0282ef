mod options;
mod progress;
mod video_info;

pub use options::{Container, DownloadOptions, PostprocessorArgs};
pub use progress::{DownloadEvent, DownloadProgress, StreamKind, format_bytes};
pub use video_info::{Extraction, Format, PlaylistInfo, VideoInfo};
