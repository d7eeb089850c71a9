//! Picking the audio and video streams to decode.

use ffmpeg_next::Rational;

use crate::{
    configuration::SelectionPolicy,
    error::FramewalkError,
    source::{MediaKind, MediaSource, StreamDecoder},
};

/// Stream indices chosen for a run. Fixed once selection returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectedStreams {
    pub video: Option<usize>,
    pub audio: Option<usize>,
}

impl SelectedStreams {
    /// Whether packets of `stream_index` should be decoded.
    pub fn contains(&self, stream_index: usize) -> bool {
        self.video == Some(stream_index) || self.audio == Some(stream_index)
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    fn slot(&mut self, kind: MediaKind) -> Option<&mut Option<usize>> {
        match kind {
            MediaKind::Video => Some(&mut self.video),
            MediaKind::Audio => Some(&mut self.audio),
            MediaKind::Other => None,
        }
    }
}

/// A decoder together with the stream it was opened for.
pub(crate) struct OpenedStream<D> {
    pub(crate) index: usize,
    /// Time base of the stream's packets as read from the container.
    pub(crate) time_base: Rational,
    pub(crate) decoder: D,
}

/// Decoders opened by [`select_streams`], in stream order.
pub(crate) struct Selection<D> {
    pub(crate) streams: SelectedStreams,
    pub(crate) decoders: Vec<OpenedStream<D>>,
}

/// Scan the container's streams in order and open a decoder for the first
/// audio and the first video stream.
///
/// With [`SelectionPolicy::StopOnFailure`] the first decoder that fails to
/// open ends the scan. With [`SelectionPolicy::SkipFailed`] the stream is
/// skipped and the scan goes on.
///
/// # Errors
///
/// Fails only when nothing was selected: with the decoder error that ended
/// (or last occurred during) the scan if there was one, otherwise with
/// [`FramewalkError::NoStream`].
pub(crate) fn select_streams<S: MediaSource>(
    source: &mut S,
    policy: SelectionPolicy,
) -> Result<Selection<S::Decoder>, FramewalkError> {
    let mut streams = SelectedStreams::default();
    let mut decoders = Vec::new();
    let mut last_failure = None;

    for descriptor in source.streams() {
        let Some(slot) = streams.slot(descriptor.kind) else {
            continue;
        };
        if slot.is_some() {
            continue;
        }

        match source.open_decoder(&descriptor) {
            Ok(decoder) => {
                log::debug!(
                    "Selected {} stream {} (codec={}, time_base={}, decoder time_base={})",
                    descriptor.kind,
                    descriptor.index,
                    descriptor.codec,
                    descriptor.time_base,
                    decoder.time_base(),
                );
                *slot = Some(descriptor.index);
                decoders.push(OpenedStream {
                    index: descriptor.index,
                    time_base: descriptor.time_base,
                    decoder,
                });
            }
            Err(error) => {
                log::warn!("Skipping {} stream {}: {error}", descriptor.kind, descriptor.index);
                last_failure = Some(error);
                if policy == SelectionPolicy::StopOnFailure {
                    break;
                }
            }
        }
    }

    if streams.is_empty() {
        return Err(last_failure.unwrap_or(FramewalkError::NoStream));
    }

    Ok(Selection { streams, decoders })
}
