//! Condensed terminal progress for non-debug runs.
//!
//! The renderer only consumes events; dropping it never changes a download.

use std::fmt::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use yt_dlp::{DownloadEvent, DownloadProgress, StreamKind};

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render events until every sender is dropped.
pub fn spawn_renderer(mut rx: mpsc::UnboundedReceiver<DownloadEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut renderer = Renderer::default();
        while let Some(event) = rx.recv().await {
            renderer.handle(&event);
        }
        renderer.close();
    })
}

/// One line, e.g. `[video]  42.0% of 10.49 MB at 2.10 MB/s ETA 0:03`.
pub fn format_line(progress: &DownloadProgress) -> String {
    let mut line = progress.stream.label().to_string();
    match progress.percent {
        Some(percent) => {
            let _ = write!(line, " {percent:>5.1}%");
        }
        None => line.push_str("   ---%")
    }
    if let Some(total) = progress.format_total() {
        let _ = write!(line, " of {total}");
    }
    if let Some(speed) = progress.format_speed() {
        let _ = write!(line, " at {speed}");
    }
    if let Some(eta) = progress.format_eta() {
        let _ = write!(line, " ETA {eta}");
    }
    line
}

#[derive(Default)]
struct Renderer {
    bar: Option<ProgressBar>,
    stream: Option<StreamKind>
}

impl Renderer {
    fn handle(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Progress(progress) => {
                if self.stream != Some(progress.stream) {
                    self.close();
                    self.bar = Some(line_bar());
                    self.stream = Some(progress.stream);
                }
                if let Some(ref bar) = self.bar {
                    bar.set_message(format_line(progress));
                }
            }
            DownloadEvent::MergingFormats => self.spin("Merging audio and video..."),
            DownloadEvent::PostProcessing { .. } => self.spin("Post-processing..."),
            DownloadEvent::Finished { .. } => self.close(),
            _ => {}
        }
    }

    fn spin(&mut self, message: &'static str) {
        if self.stream.is_none() && self.bar.is_some() {
            return;
        }
        self.close();
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(SPINNER_TICKS)
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        self.bar = Some(bar);
    }

    fn close(&mut self) {
        if let Some(bar) = self.bar.take() {
            if self.stream.is_some() {
                bar.finish();
            } else {
                bar.finish_and_clear();
            }
        }
        self.stream = None;
    }
}

fn line_bar() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let progress = DownloadProgress {
            downloaded_bytes: 0,
            total_bytes: Some(10_490_000),
            speed: Some(2_100_000.0),
            eta: Some(3.0),
            percent: Some(42.0),
            stream: StreamKind::Video
        };
        assert_eq!(format_line(&progress), "[video]  42.0% of 10.49 MB at 2.10 MB/s ETA 0:03");
    }

    #[test]
    fn test_format_line_unknown_total() {
        let progress = DownloadProgress {
            stream: StreamKind::Audio,
            ..DownloadProgress::default()
        };
        assert_eq!(format_line(&progress), "[audio]   ---%");
    }

    #[tokio::test]
    async fn test_renderer_ends_with_senders() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = spawn_renderer(rx);
        tx.send(DownloadEvent::Progress(DownloadProgress::default())).unwrap();
        tx.send(DownloadEvent::MergingFormats).unwrap();
        tx.send(DownloadEvent::Finished {
            filename: "x.mp4".to_string()
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
