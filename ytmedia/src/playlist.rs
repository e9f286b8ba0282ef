use std::path::Path;

use yt_dlp::{Container, Extraction, PlaylistInfo};

use crate::models::{Advisory, FailureMarker, PlaylistResult};
use crate::reconcile::reconcile_video;

/// Tally a fault tolerant playlist run.
///
/// Slots yt-dlp left as `null`, and requested indices it never reported at
/// all, both count as failures, so `downloads + failed == total` holds.
/// Nested playlists (the tabs of a channel) are flattened into the same tally.
pub fn aggregate(
    info: &PlaylistInfo,
    output_dir: &Path,
    playlist_url: &str,
    container: Container,
    advisories: &[Advisory]
) -> PlaylistResult {
    let mut result = PlaylistResult {
        advisories: advisories.to_vec(),
        ..PlaylistResult::default()
    };
    let mut tally = Tally {
        output_dir,
        playlist_url,
        container,
        result: &mut result
    };
    tally.collect(info, &[]);

    tracing::info!(
        downloaded = result.success_count(),
        failed = result.failed_count(),
        total = result.total,
        "playlist finished"
    );
    result
}

struct Tally<'a> {
    output_dir: &'a Path,
    playlist_url: &'a str,
    container: Container,
    result: &'a mut PlaylistResult
}

impl Tally<'_> {
    fn collect(&mut self, info: &PlaylistInfo, parent: &[u32]) {
        let index_of = |slot: usize, entry_index: Option<u32>| {
            info.requested_entries
                .get(slot)
                .copied()
                .or(entry_index)
                .unwrap_or_else(|| u32::try_from(slot + 1).unwrap_or(u32::MAX))
        };
        let path = |index: u32| {
            let mut path = parent.to_vec();
            path.push(index);
            path
        };

        for (slot, entry) in info.entries.iter().enumerate() {
            match entry {
                None => {
                    let marker = FailureMarker::for_path(&path(index_of(slot, None)));
                    tracing::warn!(%marker, "playlist entry could not be downloaded");
                    self.fail(marker);
                }
                Some(Extraction::Playlist(nested)) => {
                    tracing::debug!(id = %nested.id, "descending into nested playlist");
                    self.collect(nested, &path(index_of(slot, None)));
                }
                Some(Extraction::Video(entry)) => {
                    self.result.total += 1;
                    let url = entry.source_url().unwrap_or(self.playlist_url);
                    match reconcile_video(entry, self.output_dir, url, self.container, Vec::new()) {
                        Ok(download) => self.result.downloads.push(download),
                        Err(e) => {
                            let marker = FailureMarker::for_path(&path(index_of(slot, entry.playlist_index)));
                            tracing::warn!(%marker, error = %e, "could not reconcile playlist entry");
                            self.result.failed.push(marker);
                        }
                    }
                }
            }
        }

        for index in missing_indices(info) {
            let marker = FailureMarker::for_path(&path(index));
            tracing::warn!(%marker, "playlist entry was dropped by yt-dlp");
            self.fail(marker);
        }
    }

    fn fail(&mut self, marker: FailureMarker) {
        self.result.total += 1;
        self.result.failed.push(marker);
    }
}

/// Requested indices for which yt-dlp returned no slot at all.
fn missing_indices(info: &PlaylistInfo) -> Vec<u32> {
    let returned = info.entries.len();
    if info.requested_entries.len() > returned {
        return info.requested_entries[returned..].to_vec();
    }
    match info.playlist_count {
        Some(count) if info.requested_entries.is_empty() => {
            let first = u32::try_from(returned).unwrap_or(u32::MAX).saturating_add(1);
            (first..=count).collect()
        }
        _ => Vec::new()
    }
}
