//! FFmpeg log level control.
//!
//! FFmpeg prints its own diagnostics to stderr, independently of the Rust
//! [`log`](https://crates.io/crates/log) facade used by this crate.
//! [`FfmpegLogLevel`] lets callers tune that output without importing
//! `ffmpeg-next` themselves. The `framewalk` binary raises it to
//! [`FfmpegLogLevel::Debug`] so every demuxer and decoder decision is visible.

use ffmpeg_next::util::log::Level;

/// FFmpeg internal log verbosity, from silent to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Nothing at all.
    Quiet,
    /// Only conditions after which FFmpeg aborts.
    Panic,
    Fatal,
    Error,
    Warning,
    /// FFmpeg's own default.
    Info,
    Verbose,
    /// Per-packet demuxer and decoder decisions.
    Debug,
    /// Everything, including bitstream-level detail.
    Trace,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Self {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// Set FFmpeg's own log verbosity. Does not touch the `log` facade.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    log::debug!("Setting FFmpeg log level to {level:?}");
    ffmpeg_next::util::log::set_level(Level::from(level));
}
