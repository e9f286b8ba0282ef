use std::path::Path;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use yt_dlp::{Container, DownloadEvent, Extraction, YtDlp};

use crate::capability::{Capabilities, Dependency};
use crate::error::{Error, Result};
use crate::models::{
    AudioQuality, DownloadRequest, DownloadResult, FailureMarker, MetadataRecord, PlaylistResult, ResolutionTarget
};
use crate::playlist;
use crate::reconcile::{self, classify_failure};
use crate::request::{self, RequestConfig, RequestOptions, Verbosity};
use crate::selector::{self, StreamSelector};

/// Runs the select, build, invoke and reconcile pipeline against one yt-dlp client.
pub struct Downloader<'a> {
    client: YtDlp,
    capabilities: &'a Capabilities,
    progress: Option<mpsc::UnboundedSender<DownloadEvent>>
}

impl<'a> Downloader<'a> {
    pub fn new(client: YtDlp, capabilities: &'a Capabilities) -> Self {
        Self {
            client,
            capabilities,
            progress: None
        }
    }

    /// Forward engine events to `tx` for condensed progress display.
    ///
    /// Nothing is forwarded for debug requests, whose full engine output is logged instead.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<DownloadEvent>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        self.capabilities
    }

    /// Output of `yt-dlp --version`.
    pub async fn engine_version(&self) -> yt_dlp::Result<String> {
        self.client.check_binary().await
    }

    pub async fn download_video(&self, request: &DownloadRequest) -> Result<DownloadResult> {
        self.capabilities.require(Dependency::YtDlp, "downloading")?;

        let selector = selector::select(
            request.resolution,
            request.include_audio,
            self.capabilities.has_ffmpeg(),
            Container::Mp4
        );
        let config = self.build(selector, &request.output_dir, RequestOptions {
            allow_playlist: request.allow_playlist,
            verbosity: Verbosity::from_debug(request.debug),
            ..RequestOptions::default()
        })?;

        let outcome = self.invoke(&request.url, &config).await;
        reconcile::reconcile(
            outcome,
            &config.output_dir,
            &request.url,
            config.container,
            config.selector.advisories.clone()
        )
    }

    pub async fn download_audio(
        &self,
        url: &str,
        output_dir: &Path,
        quality: &AudioQuality,
        debug: bool
    ) -> Result<DownloadResult> {
        self.capabilities.require(Dependency::YtDlp, "downloading")?;
        self.capabilities.require(Dependency::Ffmpeg, "MP3 conversion")?;

        let config = self.build(selector::audio_only(), output_dir, RequestOptions {
            audio_quality: Some(quality.clone()),
            verbosity: Verbosity::from_debug(debug),
            ..RequestOptions::default()
        })?;

        let outcome = self.invoke(url, &config).await;
        reconcile::reconcile(outcome, &config.output_dir, url, config.container, Vec::new())
    }

    /// Download every entry of a playlist in one fault tolerant engine run.
    ///
    /// Entries that fail are recorded in [`PlaylistResult::failed`]; only a
    /// failure of the whole run is returned as an error.
    pub async fn download_playlist(
        &self,
        url: &str,
        output_dir: &Path,
        resolution: ResolutionTarget,
        debug: bool
    ) -> Result<PlaylistResult> {
        self.capabilities.require(Dependency::YtDlp, "downloading")?;

        let selector = selector::select(resolution, true, self.capabilities.has_ffmpeg(), Container::Mp4);
        let config = self.build(selector, output_dir, RequestOptions {
            allow_playlist: true,
            ignore_errors: true,
            verbosity: Verbosity::from_debug(debug),
            ..RequestOptions::default()
        })?;
        let advisories = &config.selector.advisories;

        let extraction = self.invoke(url, &config).await.map_err(|e| match classify_failure(url, e) {
            Error::MergeError { url, reason } => Error::DownloadFailed { url, reason },
            other => other
        })?;

        match extraction {
            Extraction::Playlist(info) => Ok(playlist::aggregate(
                &info,
                &config.output_dir,
                url,
                config.container,
                advisories
            )),
            Extraction::Video(info) => {
                tracing::info!("{url} is a single video, not a playlist");
                let mut result = PlaylistResult {
                    total: 1,
                    advisories: advisories.clone(),
                    ..PlaylistResult::default()
                };
                match reconcile::reconcile_video(&info, &config.output_dir, url, config.container, Vec::new()) {
                    Ok(download) => result.downloads.push(download),
                    Err(e) => {
                        tracing::warn!(error = %e, "could not reconcile download");
                        result.failed.push(FailureMarker::for_index(1));
                    }
                }
                Ok(result)
            }
        }
    }

    /// Metadata only, nothing is written to disk.
    pub async fn get_metadata(&self, url: &str) -> Result<MetadataRecord> {
        self.capabilities.require(Dependency::YtDlp, "fetching metadata")?;

        let info = self
            .client
            .get_video_info(url)
            .await
            .map_err(|e| classify_failure(url, e))?;
        Ok(MetadataRecord::from(&info))
    }

    fn build(&self, selector: StreamSelector, output_dir: &Path, options: RequestOptions) -> Result<RequestConfig> {
        for advisory in &selector.advisories {
            tracing::warn!("{advisory}");
        }
        request::build(selector, output_dir, RequestOptions {
            js_runtimes: self.capabilities.js_runtimes().to_vec(),
            ..options
        })
    }

    async fn invoke(&self, url: &str, config: &RequestConfig) -> yt_dlp::Result<Extraction> {
        let options = config.to_options();
        let mut events = self.client.extract_with_progress(url, &options);
        let forward = match config.verbosity {
            Verbosity::Condensed => self.progress.as_ref(),
            Verbosity::Diagnostic => None
        };

        while let Some(event) = events.next().await {
            let event = event?;
            match event {
                DownloadEvent::Extracted(extraction) => return Ok(*extraction),
                DownloadEvent::Warning { ref message } => tracing::warn!("yt-dlp: {message}"),
                DownloadEvent::Error { ref message } if config.ignore_errors => {
                    tracing::warn!("yt-dlp: {message}");
                }
                DownloadEvent::Extracting { ref url } => tracing::info!("extracting {url}"),
                _ => {}
            }

            if let Some(tx) = forward {
                // the renderer may already be gone
                let _ = tx.send(event);
            }
        }

        Err(yt_dlp::Error::MissingOutput)
    }
}
