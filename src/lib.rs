//! # framewalk
//!
//! Walk the packets of a media file, decode them one at a time, and print a
//! short metadata block for every frame that comes out.
//!
//! `framewalk` opens a container with FFmpeg (via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate), selects the
//! first audio and the first video stream, and runs a single-threaded decode
//! loop. Each decoded video frame is reported with its size and sample aspect
//! ratio, each audio frame with its sample and channel counts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framewalk::{DriverOptions, FramewalkError};
//!
//! let statistics = framewalk::decode_file("input.mp4", &DriverOptions::new(), std::io::stdout())?;
//! println!("{} video frames, {} audio frames", statistics.video_frames, statistics.audio_frames);
//! # Ok::<(), FramewalkError>(())
//! ```
//!
//! ## Other backends
//!
//! The decode loop ([`DecodeDriver`]) is generic over [`MediaSource`]. The
//! FFmpeg backend is [`FfmpegSource`]; anything else that can list streams,
//! open decoders, allocate a frame and read packets can drive the same loop.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the system.

pub mod configuration;
pub mod driver;
pub mod error;
pub mod ffmpeg;
pub mod ffmpeg_source;
mod packet_exchange;
pub mod report;
pub mod selection;
pub mod source;

pub use configuration::{DriverOptions, SelectionPolicy};
pub use driver::{DecodeDriver, DecodeStatistics, decode_file};
pub use error::FramewalkError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use ffmpeg_source::{
    AudioStreamDecoder, FfmpegDecoder, FfmpegFrame, FfmpegPacket, FfmpegSource,
    VideoStreamDecoder,
};
pub use report::FrameReporter;
pub use selection::SelectedStreams;
pub use source::{
    FrameBuffer, FrameSummary, MediaKind, MediaSource, SourcePacket, StreamDecoder,
    StreamDescriptor,
};

/// Re-exported so other [`MediaSource`] implementations can name time bases.
pub use ffmpeg_next::Rational;
