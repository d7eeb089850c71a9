//! Packet-in, frame-out exchange with a send/receive codec.
//!
//! FFmpeg decoders refuse a packet with `EAGAIN` while frames they already
//! produced are still waiting to be received. [`decode_one`] pulls those
//! frames until the packet is accepted, so a stream never stalls, and
//! reports at most one frame per packet.

use ffmpeg_next::{Error as FfmpegError, Packet, codec::decoder::Opened, util::frame::Frame};

use crate::error::FramewalkError;

/// A codec driven through the send/receive API.
pub(crate) trait PacketCodec {
    type Packet;
    type Frame: BestEffortFrame;

    fn push_packet(&mut self, packet: &Self::Packet) -> Result<(), FfmpegError>;

    fn push_eof(&mut self) -> Result<(), FfmpegError>;

    fn pull_frame(&mut self, frame: &mut Self::Frame) -> Result<(), FfmpegError>;
}

/// A decoded frame whose presentation timestamp can be replaced by the
/// decoder's best-effort estimate.
pub(crate) trait BestEffortFrame {
    fn stamp_best_effort(&mut self);
}

impl PacketCodec for Opened {
    type Packet = Packet;
    type Frame = Frame;

    fn push_packet(&mut self, packet: &Packet) -> Result<(), FfmpegError> {
        self.send_packet(packet)
    }

    fn push_eof(&mut self) -> Result<(), FfmpegError> {
        self.send_eof()
    }

    fn pull_frame(&mut self, frame: &mut Frame) -> Result<(), FfmpegError> {
        self.receive_frame(frame)
    }
}

impl BestEffortFrame for Frame {
    fn stamp_best_effort(&mut self) {
        let timestamp = self.timestamp();
        self.set_pts(timestamp);
    }
}

fn is_again(error: &FfmpegError) -> bool {
    matches!(error, FfmpegError::Other { errno } if *errno == ffmpeg_sys_next::EAGAIN)
}

fn decode_error(stream_index: usize, error: FfmpegError) -> FramewalkError {
    FramewalkError::PacketDecode {
        stream_index,
        reason: error.to_string(),
    }
}

/// Receives one frame. `Ok(false)` means the codec needs more input or is
/// fully drained.
pub(crate) fn receive_one<C: PacketCodec>(
    codec: &mut C,
    stream_index: usize,
    frame: &mut C::Frame,
) -> Result<bool, FramewalkError> {
    match codec.pull_frame(frame) {
        Ok(()) => {
            frame.stamp_best_effort();
            Ok(true)
        }
        Err(FfmpegError::Eof) => Ok(false),
        Err(error) if is_again(&error) => Ok(false),
        Err(error) => Err(decode_error(stream_index, error)),
    }
}

/// Sends `packet` and receives at most one frame.
///
/// When the codec answers `EAGAIN`, pending frames are pulled until it takes
/// the packet. The last pulled frame is the one reported; earlier ones are
/// discarded.
pub(crate) fn decode_one<C: PacketCodec>(
    codec: &mut C,
    stream_index: usize,
    packet: &C::Packet,
    frame: &mut C::Frame,
) -> Result<bool, FramewalkError> {
    match codec.push_packet(packet) {
        Ok(()) => return receive_one(codec, stream_index, frame),
        Err(error) if is_again(&error) => {}
        Err(error) => return Err(decode_error(stream_index, error)),
    }

    let mut discarded = 0_u32;
    loop {
        if !receive_one(codec, stream_index, frame)? {
            return Err(FramewalkError::PacketDecode {
                stream_index,
                reason: "decoder refused the packet and has no frame pending".to_string(),
            });
        }
        match codec.push_packet(packet) {
            Ok(()) => break,
            Err(error) if is_again(&error) => discarded += 1,
            Err(error) => return Err(decode_error(stream_index, error)),
        }
    }

    if discarded > 0 {
        log::debug!("Discarded {discarded} pending frame(s) on stream {stream_index}");
    }
    Ok(true)
}

/// Signals end of input once, then receives one buffered frame per call.
pub(crate) fn drain_one<C: PacketCodec>(
    codec: &mut C,
    draining: &mut bool,
    stream_index: usize,
    frame: &mut C::Frame,
) -> Result<bool, FramewalkError> {
    if !*draining {
        *draining = true;
        codec
            .push_eof()
            .map_err(|error| decode_error(stream_index, error))?;
    }
    receive_one(codec, stream_index, frame)
}
