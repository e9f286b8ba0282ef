//! Translates what the caller wants into a yt-dlp format expression.
//!
//! A [`StreamSelector`] is an ordered list of alternatives joined with `/`;
//! yt-dlp uses the first one that resolves for the given video.

use std::fmt;

use yt_dlp::Container;

use crate::models::{Advisory, ResolutionTarget};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFilter {
    pub max_height: Option<u32>,
    pub ext: Option<&'static str>
}

impl StreamFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn bounded(max_height: Option<u32>) -> Self {
        Self {
            max_height,
            ext: None
        }
    }

    pub fn with_ext(mut self, ext: &'static str) -> Self {
        self.ext = Some(ext);
        self
    }
}

impl fmt::Display for StreamFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(height) = self.max_height {
            write!(f, "[height<={height}]")?;
        }
        if let Some(ext) = self.ext {
            write!(f, "[ext={ext}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternative {
    /// Separate video and audio streams, merged by ffmpeg afterwards.
    Split { video: StreamFilter, audio: StreamFilter },
    VideoOnly(StreamFilter),
    /// A single stream that already carries both tracks.
    PreMuxed(StreamFilter),
    AudioOnly(StreamFilter)
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alternative::Split { video, audio } => write!(f, "bestvideo{video}+bestaudio{audio}"),
            Alternative::VideoOnly(filter) => write!(f, "bestvideo{filter}"),
            Alternative::PreMuxed(filter) => write!(f, "best{filter}"),
            Alternative::AudioOnly(filter) => write!(f, "bestaudio{filter}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSelector {
    /// Most preferred first.
    pub alternatives: Vec<Alternative>,
    pub advisories: Vec<Advisory>
}

impl StreamSelector {
    /// Whether yt-dlp will need ffmpeg to combine streams for the first choice.
    pub fn requires_merge(&self) -> bool {
        matches!(self.alternatives.first(), Some(Alternative::Split { .. }))
    }

    pub fn expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StreamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, alternative) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{alternative}")?;
        }
        Ok(())
    }
}

pub fn select(
    resolution: ResolutionTarget,
    audio_wanted: bool,
    muxer_available: bool,
    container: Container
) -> StreamSelector {
    let bound = resolution.max_height();

    if !muxer_available {
        let mut advisories = vec![Advisory::PreMuxedOnly];
        if !audio_wanted {
            advisories.push(Advisory::AudioIgnored);
        }
        let mut alternatives = vec![
            Alternative::PreMuxed(StreamFilter::bounded(bound).with_ext(container.as_str())),
            Alternative::PreMuxed(StreamFilter::bounded(bound))
        ];
        if bound.is_some() {
            alternatives.push(Alternative::PreMuxed(StreamFilter::any()));
        }
        return StreamSelector {
            alternatives,
            advisories
        };
    }

    let alternatives = if audio_wanted {
        vec![
            Alternative::Split {
                video: StreamFilter::bounded(bound),
                audio: StreamFilter::any()
            },
            Alternative::PreMuxed(StreamFilter::bounded(bound))
        ]
    } else {
        vec![Alternative::VideoOnly(StreamFilter::bounded(bound))]
    };

    StreamSelector {
        alternatives,
        advisories: Vec::new()
    }
}

/// Best audio-only stream, falling back to whatever is best overall.
pub fn audio_only() -> StreamSelector {
    StreamSelector {
        alternatives: vec![
            Alternative::AudioOnly(StreamFilter::any()),
            Alternative::PreMuxed(StreamFilter::any())
        ],
        advisories: Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn height(h: u32) -> ResolutionTarget {
        ResolutionTarget::Height(NonZeroU32::new(h).unwrap())
    }

    #[test]
    fn test_muxer_audio_best() {
        let selector = select(ResolutionTarget::Best, true, true, Container::Mp4);
        assert_eq!(selector.to_string(), "bestvideo+bestaudio/best");
        assert!(selector.requires_merge());
        assert!(selector.advisories.is_empty());
    }

    #[test]
    fn test_muxer_audio_bounded() {
        let selector = select(height(720), true, true, Container::Mp4);
        assert_eq!(selector.to_string(), "bestvideo[height<=720]+bestaudio/best[height<=720]");
        assert!(matches!(
            selector.alternatives[0],
            Alternative::Split { ref video, .. } if video.max_height == Some(720)
        ));
    }

    #[test]
    fn test_muxer_without_audio() {
        let selector = select(ResolutionTarget::Best, false, true, Container::Mp4);
        assert_eq!(selector.to_string(), "bestvideo");
        assert!(!selector.requires_merge());

        let selector = select(height(1080), false, true, Container::Mp4);
        assert_eq!(selector.to_string(), "bestvideo[height<=1080]");
    }

    #[test]
    fn test_no_muxer_best() {
        let selector = select(ResolutionTarget::Best, true, false, Container::Mp4);
        assert_eq!(selector.to_string(), "best[ext=mp4]/best");
        assert_eq!(selector.advisories, vec![Advisory::PreMuxedOnly]);
        assert!(!selector.requires_merge());
    }

    #[test]
    fn test_no_muxer_bounded_degrades_to_unbounded() {
        let selector = select(height(480), true, false, Container::Mp4);
        assert_eq!(selector.to_string(), "best[height<=480][ext=mp4]/best[height<=480]/best");
    }

    #[test]
    fn test_no_muxer_without_audio_is_advisory() {
        let selector = select(height(720), false, false, Container::Mp4);
        assert_eq!(selector.advisories, vec![Advisory::PreMuxedOnly, Advisory::AudioIgnored]);
        assert!(selector.alternatives.iter().all(|a| matches!(a, Alternative::PreMuxed(_))));
    }

    #[test]
    fn test_every_combination_is_bounded_and_non_empty() {
        for resolution in [ResolutionTarget::Best, height(144), height(2160)] {
            for audio in [true, false] {
                for muxer in [true, false] {
                    let selector = select(resolution, audio, muxer, Container::Mp4);
                    assert!(!selector.alternatives.is_empty());
                    let bounded = match selector.alternatives.as_slice() {
                        [rest @ .., Alternative::PreMuxed(last)] if !muxer && resolution.max_height().is_some() => {
                            assert_eq!(*last, StreamFilter::any());
                            rest
                        }
                        all => all
                    };
                    for alternative in bounded {
                        let filter = match alternative {
                            Alternative::Split { video, .. } => video,
                            Alternative::VideoOnly(f) | Alternative::PreMuxed(f) | Alternative::AudioOnly(f) => f
                        };
                        assert_eq!(filter.max_height, resolution.max_height());
                    }
                }
            }
        }
    }

    #[test]
    fn test_audio_only() {
        assert_eq!(audio_only().to_string(), "bestaudio/best");
    }
}
