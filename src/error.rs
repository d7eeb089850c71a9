//! Error types for the `framewalk` crate.
//!
//! [`FramewalkError`] is returned by every fallible operation. Setup errors
//! (opening, probing, stream selection, decoder and frame allocation) end a
//! run; [`FramewalkError::PacketDecode`] is absorbed by the decode loop and
//! only shows up in [`DecodeStatistics`](crate::DecodeStatistics).

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `framewalk` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramewalkError {
    /// The container could not be opened: unreadable path or unrecognised format.
    #[error("Could not open input file {path}: {reason}")]
    FileOpen {
        /// Path passed to [`FfmpegSource::open`](crate::FfmpegSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container opened but its stream information could not be determined.
    #[error("Failed to retrieve input stream information for {path}: {reason}")]
    StreamProbe {
        /// Path of the container being probed.
        path: PathBuf,
        /// Underlying reason the probe failed.
        reason: String,
    },

    /// Neither an audio nor a video stream could be selected.
    #[error("No decodable audio or video stream found")]
    NoStream,

    /// No decoder is registered for the stream's codec.
    #[error("No decoder registered for codec {codec} (stream {stream_index})")]
    UnsupportedCodec {
        /// Container index of the stream.
        stream_index: usize,
        /// Codec name reported by the container.
        codec: String,
    },

    /// A decoder was found but could not be initialised.
    #[error("Failed to open decoder for stream {stream_index}: {reason}")]
    DecoderInit {
        /// Container index of the stream.
        stream_index: usize,
        /// Underlying reason initialisation failed.
        reason: String,
    },

    /// The shared frame buffer could not be allocated.
    #[error("Failed to allocate frame buffer")]
    FrameAllocation,

    /// A packet could not be decoded. Never fatal.
    #[error("Failed to decode packet on stream {stream_index}: {reason}")]
    PacketDecode {
        /// Stream the packet belonged to.
        stream_index: usize,
        /// Underlying decoder error.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// Writing the frame report failed.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for FramewalkError {
    fn from(error: FfmpegError) -> Self {
        FramewalkError::FfmpegError(error.to_string())
    }
}

impl FramewalkError {
    /// Whether this error ends a run. Only per-packet decode failures do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FramewalkError::PacketDecode { .. })
    }
}
