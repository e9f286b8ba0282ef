//! Best-quality MP4 and MP3 downloads on top of yt-dlp and ffmpeg.
//!
//! A [`Downloader`] picks a format expression for what the caller asked for
//! and what the host can do ([`Capabilities`]), runs yt-dlp once and maps
//! its report back onto the file that ended up on disk.
//!
//! ```no_run
//! use ytmedia::{Capabilities, DownloadRequest, Downloader, ToolOverrides};
//!
//! #[tokio::main]
//! async fn main() -> ytmedia::Result<()> {
//!     let capabilities = Capabilities::new(ToolOverrides::default());
//!     let downloader = Downloader::new(yt_dlp::YtDlp::new(), &capabilities);
//!
//!     let request = DownloadRequest::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
//!         .resolution("720".parse()?);
//!     let result = downloader.download_video(&request).await?;
//!     println!("{result}");
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod config;
mod downloader;
pub mod error;
pub mod models;
pub mod playlist;
pub mod progress;
pub mod reconcile;
pub mod request;
pub mod selector;

pub use capability::{Capabilities, Dependency, JsRuntime, ToolOverrides};
pub use config::Settings;
pub use downloader::Downloader;
pub use error::{Error, Result};
pub use models::{
    Advisory, AudioQuality, DownloadRequest, DownloadResult, FailureMarker, MetadataRecord, PlaylistResult,
    ResolutionTarget
};
pub use selector::StreamSelector;
