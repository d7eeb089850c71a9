//! The capability interface the decode driver runs against.
//!
//! A decode run needs exactly six things from a media library: open/probe a
//! container, look up and open a decoder, read a packet, decode a packet into
//! a frame, rescale timestamps, and release everything. Opening happens in
//! the implementation's own constructor (see
//! [`FfmpegSource::open`](crate::FfmpegSource::open)); release is `Drop`. The
//! remaining four are the traits below.

use std::fmt;

use ffmpeg_next::Rational;

use crate::error::FramewalkError;

/// Kind of elementary stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    /// Subtitles, data, attachments: never selected.
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
            MediaKind::Other => f.write_str("other"),
        }
    }
}

/// One elementary stream inside a container.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    /// Index assigned by the container on open.
    pub index: usize,
    /// Audio, video, or anything else.
    pub kind: MediaKind,
    /// Codec name, for diagnostics.
    pub codec: String,
    /// Unit in which this stream's packet timestamps are expressed.
    pub time_base: Rational,
}

/// What gets printed for one decoded frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSummary {
    Video {
        width: u32,
        height: u32,
        sample_aspect_ratio: Rational,
        /// Best-effort presentation timestamp in the decoder's time base.
        pts: Option<i64>,
    },
    Audio {
        /// Samples per channel.
        samples: usize,
        channels: u16,
        /// Best-effort presentation timestamp in the decoder's time base.
        pts: Option<i64>,
    },
}

impl FrameSummary {
    pub fn kind(&self) -> MediaKind {
        match self {
            FrameSummary::Video { .. } => MediaKind::Video,
            FrameSummary::Audio { .. } => MediaKind::Audio,
        }
    }

    pub fn pts(&self) -> Option<i64> {
        match *self {
            FrameSummary::Video { pts, .. } | FrameSummary::Audio { pts, .. } => pts,
        }
    }
}

/// A compressed packet read from a container.
pub trait SourcePacket {
    /// Index of the stream this packet belongs to.
    fn stream_index(&self) -> usize;

    /// Convert the packet's timestamps from `from` to `to`.
    fn rescale_ts(&mut self, from: Rational, to: Rational);
}

/// The reusable decoded-frame buffer.
pub trait FrameBuffer {
    /// Drop the frame's data references so the buffer can be reused.
    fn reset(&mut self);
}

/// An opened, stateful decoder for one stream.
///
/// Implemented once per stream kind; the driver never needs to know which.
pub trait StreamDecoder {
    type Packet: SourcePacket;
    type Frame: FrameBuffer;

    /// Time base the decoder expects packet timestamps in.
    fn time_base(&self) -> Rational;

    /// Feed one packet and take at most one frame out.
    ///
    /// `Ok(None)` means the decoder is buffering. On `Ok(Some(_))` the frame
    /// buffer holds the decoded frame, already stamped with its best-effort
    /// timestamp.
    fn decode(
        &mut self,
        packet: &Self::Packet,
        frame: &mut Self::Frame,
    ) -> Result<Option<FrameSummary>, FramewalkError>;

    /// Take one frame still buffered after the last packet. Returns
    /// `Ok(None)` once the decoder is empty.
    fn flush(&mut self, frame: &mut Self::Frame) -> Result<Option<FrameSummary>, FramewalkError>;
}

/// An opened, probed container.
pub trait MediaSource {
    type Packet: SourcePacket;
    type Frame: FrameBuffer;
    type Decoder: StreamDecoder<Packet = Self::Packet, Frame = Self::Frame>;

    /// Stream descriptors in container order.
    fn streams(&self) -> Vec<StreamDescriptor>;

    /// Look up and open a decoder for `stream`.
    fn open_decoder(&mut self, stream: &StreamDescriptor) -> Result<Self::Decoder, FramewalkError>;

    /// Allocate the frame buffer shared by every decoder.
    fn allocate_frame(&self) -> Result<Self::Frame, FramewalkError>;

    /// Next packet in container order, or `Ok(None)` at end of stream.
    fn read_packet(&mut self) -> Result<Option<Self::Packet>, FramewalkError>;
}
