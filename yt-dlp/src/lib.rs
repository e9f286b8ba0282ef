//! Async Rust wrapper for the yt-dlp CLI.
//!
//! Runs yt-dlp as a child process, maps typed [`DownloadOptions`] onto its
//! flags and parses the info document it prints once downloading and
//! post-processing are finished.
//!
//! # Example
//!
//! ```no_run
//! use yt_dlp::{Container, DownloadOptions, Extraction, YtDlp};
//!
//! #[tokio::main]
//! async fn main() -> yt_dlp::Result<()> {
//!     let client = YtDlp::new();
//!
//!     let version = client.check_binary().await?;
//!     println!("yt-dlp version: {}", version);
//!
//!     let options = DownloadOptions::new()
//!         .format("bestvideo+bestaudio/best")
//!         .merge_output_format(Container::Mp4)
//!         .output_template("downloads/%(title)s.%(ext)s");
//!
//!     if let Extraction::Video(info) = client.extract("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &options).await? {
//!         println!("Downloaded: {}", info.title);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod command;
pub mod error;
pub mod types;

pub use client::YtDlp;
pub use error::{Error, Result};
pub use types::{
    Container, DownloadEvent, DownloadOptions, DownloadProgress, Extraction, Format, PlaylistInfo,
    PostprocessorArgs, StreamKind, VideoInfo, format_bytes
};
