//! Human-readable per-frame output.
//!
//! Each decoded frame becomes one block:
//!
//! ```text
//! -----------------------
//! Video : frame->width, height : 640x480
//! Video : frame->sample_aspect_ratio : 1/1
//! ```
//!
//! and a run ends with a single `End of frame` line.

use std::io::Write;

use crate::{error::FramewalkError, source::FrameSummary};

const BLOCK_SEPARATOR: &str = "-----------------------";
const END_OF_STREAM: &str = "End of frame";

/// Writes frame blocks to any [`Write`] sink and counts them.
pub struct FrameReporter<W: Write> {
    writer: W,
    video_blocks: u64,
    audio_blocks: u64,
}

impl<W: Write> FrameReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            video_blocks: 0,
            audio_blocks: 0,
        }
    }

    /// Write the block for one decoded frame.
    pub fn report(&mut self, frame: &FrameSummary) -> Result<(), FramewalkError> {
        writeln!(self.writer, "{BLOCK_SEPARATOR}")?;
        match *frame {
            FrameSummary::Video {
                width,
                height,
                sample_aspect_ratio,
                ..
            } => {
                writeln!(self.writer, "Video : frame->width, height : {width}x{height}")?;
                writeln!(
                    self.writer,
                    "Video : frame->sample_aspect_ratio : {}/{}",
                    sample_aspect_ratio.numerator(),
                    sample_aspect_ratio.denominator(),
                )?;
                self.video_blocks += 1;
            }
            FrameSummary::Audio {
                samples, channels, ..
            } => {
                writeln!(self.writer, "Audio : frame->nb_samples : {samples}")?;
                writeln!(self.writer, "Audio : frame->channels : {channels}")?;
                self.audio_blocks += 1;
            }
        }
        Ok(())
    }

    /// Write the terminal line and flush the sink.
    pub fn end_of_stream(&mut self) -> Result<(), FramewalkError> {
        writeln!(self.writer, "{END_OF_STREAM}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn video_blocks(&self) -> u64 {
        self.video_blocks
    }

    pub fn audio_blocks(&self) -> u64 {
        self.audio_blocks
    }

    /// Give the sink back.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
