//! Run configuration.
//!
//! [`DriverOptions`] is a builder threaded into
//! [`DecodeDriver::open`](crate::DecodeDriver::open) and
//! [`decode_file`](crate::decode_file). The defaults reproduce the classic
//! behaviour: stop scanning on the first decoder failure, drain decoders at
//! end of stream, leave FFmpeg's log level alone.
//!
//! # Example
//!
//! ```
//! use framewalk::{DriverOptions, FfmpegLogLevel, SelectionPolicy};
//!
//! let options = DriverOptions::new()
//!     .with_selection_policy(SelectionPolicy::SkipFailed)
//!     .with_ffmpeg_log_level(FfmpegLogLevel::Error);
//! assert!(options.flush_decoders);
//! ```

use crate::ffmpeg::FfmpegLogLevel;

/// What stream selection does when a candidate's decoder fails to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Stop scanning at the first failure; keep whatever was already selected.
    #[default]
    StopOnFailure,
    /// Skip the failed stream and keep looking for another of the same kind.
    SkipFailed,
}

/// Settings for one decode run.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Policy applied when a decoder fails to open during selection.
    pub selection_policy: SelectionPolicy,
    /// Drain frames still buffered in the decoders once the container is
    /// exhausted.
    pub flush_decoders: bool,
    /// FFmpeg log level applied before the container is opened. `None`
    /// leaves the current level in place.
    pub ffmpeg_log_level: Option<FfmpegLogLevel>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            selection_policy: SelectionPolicy::default(),
            flush_decoders: true,
            ffmpeg_log_level: None,
        }
    }
}

impl DriverOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stream selection policy.
    #[must_use]
    pub fn with_selection_policy(mut self, policy: SelectionPolicy) -> Self {
        self.selection_policy = policy;
        self
    }

    /// Enable or disable draining decoders at end of stream.
    #[must_use]
    pub fn with_flush_decoders(mut self, flush: bool) -> Self {
        self.flush_decoders = flush;
        self
    }

    /// Set FFmpeg's log level for the run.
    #[must_use]
    pub fn with_ffmpeg_log_level(mut self, level: FfmpegLogLevel) -> Self {
        self.ffmpeg_log_level = Some(level);
        self
    }
}
