//! The decode loop.
//!
//! [`DecodeDriver`] owns everything a run acquires: the container, one
//! decoder per selected stream, and a single reusable frame buffer. It reads
//! packets in container order, hands packets of the selected streams to
//! their decoder, and reports every frame that comes out. Packets of other
//! streams are dropped unread.
//!
//! Releasing is structural: the run state lives in a context whose fields
//! drop frame buffer first, then decoders in stream order, then the
//! container. Whichever way a run ends (setup error, end of stream, report
//! write failure) that happens exactly once.
//!
//! # Example
//!
//! ```no_run
//! use framewalk::{DecodeDriver, DriverOptions, FfmpegSource, FrameReporter, FramewalkError};
//!
//! let source = FfmpegSource::open("input.mp4")?;
//! let driver = DecodeDriver::open(source, DriverOptions::new())?;
//! let mut reporter = FrameReporter::new(std::io::stdout());
//! let statistics = driver.run(&mut reporter)?;
//! println!("{} frames", statistics.frames());
//! # Ok::<(), FramewalkError>(())
//! ```

use std::{io::Write, path::Path};

use crate::{
    configuration::DriverOptions,
    error::FramewalkError,
    ffmpeg::set_ffmpeg_log_level,
    ffmpeg_source::FfmpegSource,
    report::FrameReporter,
    selection::{OpenedStream, SelectedStreams, Selection, select_streams},
    source::{FrameBuffer, FrameSummary, MediaKind, MediaSource, SourcePacket, StreamDecoder},
};

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStatistics {
    /// Packets read from the container.
    pub packets_read: u64,
    /// Packets dropped because their stream was not selected.
    pub packets_skipped: u64,
    /// Packets handed to a decoder.
    pub packets_decoded: u64,
    /// Video frames reported.
    pub video_frames: u64,
    /// Audio frames reported.
    pub audio_frames: u64,
    /// Packets (or flush calls) the decoder rejected.
    pub decode_errors: u64,
}

impl DecodeStatistics {
    /// Total frames reported.
    pub fn frames(&self) -> u64 {
        self.video_frames + self.audio_frames
    }

    fn count_frame(&mut self, frame: &FrameSummary) {
        match frame.kind() {
            MediaKind::Video => self.video_frames += 1,
            MediaKind::Audio => self.audio_frames += 1,
            MediaKind::Other => {}
        }
    }
}

// Field order is release order.
struct DecodeContext<S: MediaSource> {
    frame: S::Frame,
    decoders: Vec<OpenedStream<S::Decoder>>,
    source: S,
}

impl<S: MediaSource> Drop for DecodeContext<S> {
    fn drop(&mut self) {
        log::debug!(
            "Releasing frame buffer, {} decoder(s) and container",
            self.decoders.len()
        );
    }
}

/// Runs the decode loop over any [`MediaSource`].
pub struct DecodeDriver<S: MediaSource> {
    context: DecodeContext<S>,
    selected: SelectedStreams,
    options: DriverOptions,
}

impl<S: MediaSource> DecodeDriver<S> {
    /// Select streams, open their decoders and allocate the frame buffer.
    ///
    /// # Errors
    ///
    /// Any selection error (see
    /// [`SelectionPolicy`](crate::SelectionPolicy)), or
    /// [`FramewalkError::FrameAllocation`]. Whatever was acquired before the
    /// failure is released before this returns.
    pub fn open(mut source: S, options: DriverOptions) -> Result<Self, FramewalkError> {
        let stream_count = source.streams().len();
        let Selection { streams: selected, decoders } =
            select_streams(&mut source, options.selection_policy)?;
        let frame = source.allocate_frame()?;

        log::debug!(
            "Decode driver ready (video={:?}, audio={:?}, streams={})",
            selected.video,
            selected.audio,
            stream_count,
        );

        Ok(Self {
            context: DecodeContext {
                frame,
                decoders,
                source,
            },
            selected,
            options,
        })
    }

    /// Streams chosen for decoding.
    pub fn selected_streams(&self) -> SelectedStreams {
        self.selected
    }

    /// Decode the whole container, writing one block per frame and a final
    /// end-of-stream line. Consumes the driver; everything is released when
    /// this returns.
    ///
    /// Decode failures are counted and skipped. A read error other than end
    /// of stream ends the loop as if the container were exhausted.
    ///
    /// # Errors
    ///
    /// [`FramewalkError::IoError`] from writing the report, or any error a
    /// decoder returns for which [`FramewalkError::is_fatal`] holds. Frames
    /// already written stay written; "End of frame" is not.
    pub fn run<W: Write>(
        mut self,
        reporter: &mut FrameReporter<W>,
    ) -> Result<DecodeStatistics, FramewalkError> {
        let mut statistics = DecodeStatistics::default();
        let DecodeContext {
            frame,
            decoders,
            source,
        } = &mut self.context;

        loop {
            let mut packet = match source.read_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(error) => {
                    log::warn!("Treating read failure as end of stream: {error}");
                    break;
                }
            };
            statistics.packets_read += 1;

            let stream_index = packet.stream_index();
            let opened = if self.selected.contains(stream_index) {
                decoders.iter_mut().find(|opened| opened.index == stream_index)
            } else {
                None
            };
            let Some(OpenedStream {
                time_base, decoder, ..
            }) = opened
            else {
                log::trace!("Dropping packet of unselected stream {stream_index}");
                statistics.packets_skipped += 1;
                continue;
            };

            packet.rescale_ts(*time_base, decoder.time_base());
            statistics.packets_decoded += 1;

            match decoder.decode(&packet, frame) {
                Ok(Some(summary)) => {
                    reporter.report(&summary)?;
                    statistics.count_frame(&summary);
                    frame.reset();
                }
                Ok(None) => {}
                Err(error) if error.is_fatal() => {
                    log::error!("Aborting decode: {error}");
                    return Err(error);
                }
                Err(error) => {
                    log::debug!("{error}");
                    statistics.decode_errors += 1;
                }
            }
        }

        if self.options.flush_decoders {
            for OpenedStream { index, decoder, .. } in decoders.iter_mut() {
                loop {
                    match decoder.flush(frame) {
                        Ok(Some(summary)) => {
                            reporter.report(&summary)?;
                            statistics.count_frame(&summary);
                            frame.reset();
                        }
                        Ok(None) => break,
                        Err(error) if error.is_fatal() => {
                            log::error!("Aborting drain of stream {index}: {error}");
                            return Err(error);
                        }
                        Err(error) => {
                            log::debug!("Stopped draining stream {index}: {error}");
                            statistics.decode_errors += 1;
                            break;
                        }
                    }
                }
            }
        }

        reporter.end_of_stream()?;

        log::info!(
            "Decoded {} video and {} audio frames from {} packets ({} skipped, {} decode errors)",
            statistics.video_frames,
            statistics.audio_frames,
            statistics.packets_read,
            statistics.packets_skipped,
            statistics.decode_errors,
        );

        Ok(statistics)
    }
}

/// Open `path` with FFmpeg and run a full decode, writing the report to
/// `writer`.
///
/// # Errors
///
/// Every setup error of [`FfmpegSource::open`] and [`DecodeDriver::open`],
/// and I/O errors from `writer`.
pub fn decode_file<P: AsRef<Path>, W: Write>(
    path: P,
    options: &DriverOptions,
    writer: W,
) -> Result<DecodeStatistics, FramewalkError> {
    if let Some(level) = options.ffmpeg_log_level {
        set_ffmpeg_log_level(level);
    }

    let source = FfmpegSource::open(path)?;
    let driver = DecodeDriver::open(source, options.clone())?;
    let mut reporter = FrameReporter::new(writer);
    driver.run(&mut reporter)
}
