//! FFmpeg implementation of the [`MediaSource`] capability interface.
//!
//! [`FfmpegSource`] owns the demuxer context. Decoders are dispatched by
//! stream kind through [`FfmpegDecoder`]: each variant wraps a per-kind
//! decoder implementing [`StreamDecoder`], so the decode loop never has to
//! pick a decode routine itself.

use std::{
    borrow::Cow,
    ffi::CString,
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    ptr,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::{
        context::Context as CodecContext,
        decoder::{self, Opened},
    },
    format::context::Input,
    media::Type,
    util::frame::Frame,
};

use crate::{
    error::FramewalkError,
    packet_exchange::{decode_one, drain_one},
    source::{
        FrameBuffer, FrameSummary, MediaKind, MediaSource, SourcePacket, StreamDecoder,
        StreamDescriptor,
    },
};

/// An opened and probed media container.
///
/// The container is closed when this value is dropped.
///
/// # Example
///
/// ```no_run
/// use framewalk::{FfmpegSource, FramewalkError, MediaSource};
///
/// let source = FfmpegSource::open("input.mkv")?;
/// for stream in source.streams() {
///     println!("#{} {} {}", stream.index, stream.kind, stream.codec);
/// }
/// # Ok::<(), FramewalkError>(())
/// ```
pub struct FfmpegSource {
    input: Input,
    path: PathBuf,
}

impl Debug for FfmpegSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegSource")
            .field("path", &self.path)
            .field("streams", &self.input.nb_streams())
            .finish_non_exhaustive()
    }
}

impl FfmpegSource {
    /// Open the container at `path` and probe its streams.
    ///
    /// # Errors
    ///
    /// [`FramewalkError::FileOpen`] when the file cannot be read or its
    /// format is not recognised, [`FramewalkError::StreamProbe`] when stream
    /// information cannot be determined. In the second case the container is
    /// closed again before returning.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramewalkError> {
        let path = path.as_ref().to_path_buf();

        log::debug!("Opening media file: {}", path.display());

        // Safe to call repeatedly.
        ffmpeg_next::init()?;

        let c_path = CString::new(path_bytes(&path).into_owned()).map_err(|_| {
            FramewalkError::FileOpen {
                path: path.clone(),
                reason: "path contains an interior NUL byte".to_string(),
            }
        })?;

        // Open and probe are separate steps so their failures stay distinguishable.
        let input = unsafe {
            let mut context = ptr::null_mut();
            let status = ffmpeg_sys_next::avformat_open_input(
                &mut context,
                c_path.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
            );
            if status < 0 {
                return Err(FramewalkError::FileOpen {
                    path,
                    reason: FfmpegError::from(status).to_string(),
                });
            }

            let status = ffmpeg_sys_next::avformat_find_stream_info(context, ptr::null_mut());
            if status < 0 {
                ffmpeg_sys_next::avformat_close_input(&mut context);
                return Err(FramewalkError::StreamProbe {
                    path,
                    reason: FfmpegError::from(status).to_string(),
                });
            }

            Input::wrap(context)
        };

        log::info!(
            "Opened media file: {} (format={}, streams={})",
            path.display(),
            input.format().name(),
            input.nb_streams(),
        );

        Ok(Self { input, path })
    }
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;

    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        log::debug!("Closing media file: {}", self.path.display());
    }
}

fn media_kind(medium: Type) -> MediaKind {
    match medium {
        Type::Video => MediaKind::Video,
        Type::Audio => MediaKind::Audio,
        _ => MediaKind::Other,
    }
}

fn valid_time_base(time_base: Rational) -> bool {
    time_base.numerator() > 0 && time_base.denominator() > 0
}

impl MediaSource for FfmpegSource {
    type Packet = FfmpegPacket;
    type Frame = FfmpegFrame;
    type Decoder = FfmpegDecoder;

    fn streams(&self) -> Vec<StreamDescriptor> {
        self.input
            .streams()
            .map(|stream| {
                let parameters = stream.parameters();
                StreamDescriptor {
                    index: stream.index(),
                    kind: media_kind(parameters.medium()),
                    codec: parameters.id().name().to_string(),
                    time_base: stream.time_base(),
                }
            })
            .collect()
    }

    fn open_decoder(&mut self, stream: &StreamDescriptor) -> Result<FfmpegDecoder, FramewalkError> {
        let stream_index = stream.index;
        let init_error = |reason: String| FramewalkError::DecoderInit {
            stream_index,
            reason,
        };

        let parameters = self
            .input
            .stream(stream_index)
            .ok_or_else(|| init_error("stream not present in container".to_string()))?
            .parameters();

        let codec = decoder::find(parameters.id()).ok_or_else(|| {
            FramewalkError::UnsupportedCodec {
                stream_index,
                codec: stream.codec.clone(),
            }
        })?;

        let mut context = CodecContext::from_parameters(parameters)
            .map_err(|error| init_error(format!("invalid codec parameters: {error}")))?;

        // Packets are rescaled into this time base before they reach the decoder.
        let context_time_base = unsafe { Rational::from((*context.as_ptr()).time_base) };
        let time_base = if valid_time_base(context_time_base) {
            context_time_base
        } else {
            stream.time_base
        };
        unsafe {
            (*context.as_mut_ptr()).pkt_timebase = time_base.into();
        }

        let opened = context
            .decoder()
            .open_as(codec)
            .map_err(|error| init_error(error.to_string()))?;

        let decoder = match stream.kind {
            MediaKind::Video => FfmpegDecoder::Video(VideoStreamDecoder {
                decoder: opened
                    .video()
                    .map_err(|error| init_error(error.to_string()))?,
                stream_index,
                time_base,
                draining: false,
            }),
            MediaKind::Audio => FfmpegDecoder::Audio(AudioStreamDecoder {
                decoder: opened
                    .audio()
                    .map_err(|error| init_error(error.to_string()))?,
                stream_index,
                time_base,
                draining: false,
            }),
            MediaKind::Other => {
                return Err(init_error(format!("{} streams are not decoded", stream.kind)));
            }
        };

        log::debug!(
            "Opened {} decoder for stream {stream_index} (time_base={time_base})",
            stream.codec,
        );

        Ok(decoder)
    }

    fn allocate_frame(&self) -> Result<FfmpegFrame, FramewalkError> {
        let frame = unsafe { Frame::empty() };
        if unsafe { frame.as_ptr() }.is_null() {
            return Err(FramewalkError::FrameAllocation);
        }
        Ok(FfmpegFrame { frame })
    }

    fn read_packet(&mut self) -> Result<Option<FfmpegPacket>, FramewalkError> {
        let mut packet = Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some(FfmpegPacket(packet))),
            Err(FfmpegError::Eof) => Ok(None),
            Err(error) => Err(FramewalkError::from(error)),
        }
    }
}

/// A demuxed packet.
pub struct FfmpegPacket(Packet);

impl SourcePacket for FfmpegPacket {
    fn stream_index(&self) -> usize {
        self.0.stream()
    }

    fn rescale_ts(&mut self, from: Rational, to: Rational) {
        self.0.rescale_ts(from, to);
    }
}

/// The reusable decoded frame.
pub struct FfmpegFrame {
    frame: Frame,
}

impl FrameBuffer for FfmpegFrame {
    fn reset(&mut self) {
        unsafe { ffmpeg_sys_next::av_frame_unref(self.frame.as_mut_ptr()) };
    }
}

/// Decoder for a video stream.
pub struct VideoStreamDecoder {
    decoder: decoder::Video,
    stream_index: usize,
    time_base: Rational,
    draining: bool,
}

impl VideoStreamDecoder {
    fn summarize(frame: &FfmpegFrame) -> FrameSummary {
        let raw = unsafe { &*frame.frame.as_ptr() };
        FrameSummary::Video {
            width: raw.width.max(0) as u32,
            height: raw.height.max(0) as u32,
            sample_aspect_ratio: Rational::from(raw.sample_aspect_ratio),
            pts: frame.frame.pts(),
        }
    }
}

impl StreamDecoder for VideoStreamDecoder {
    type Packet = FfmpegPacket;
    type Frame = FfmpegFrame;

    fn time_base(&self) -> Rational {
        self.time_base
    }

    fn decode(
        &mut self,
        packet: &FfmpegPacket,
        frame: &mut FfmpegFrame,
    ) -> Result<Option<FrameSummary>, FramewalkError> {
        let codec: &mut Opened = &mut self.decoder;
        let produced = decode_one(codec, self.stream_index, &packet.0, &mut frame.frame)?;
        Ok(produced.then(|| Self::summarize(frame)))
    }

    fn flush(&mut self, frame: &mut FfmpegFrame) -> Result<Option<FrameSummary>, FramewalkError> {
        let codec: &mut Opened = &mut self.decoder;
        let produced = drain_one(codec, &mut self.draining, self.stream_index, &mut frame.frame)?;
        Ok(produced.then(|| Self::summarize(frame)))
    }
}

/// Decoder for an audio stream.
pub struct AudioStreamDecoder {
    decoder: decoder::Audio,
    stream_index: usize,
    time_base: Rational,
    draining: bool,
}

impl AudioStreamDecoder {
    fn summarize(frame: &FfmpegFrame) -> FrameSummary {
        let raw = unsafe { &*frame.frame.as_ptr() };
        FrameSummary::Audio {
            samples: raw.nb_samples.max(0) as usize,
            channels: raw.ch_layout.nb_channels.max(0) as u16,
            pts: frame.frame.pts(),
        }
    }
}

impl StreamDecoder for AudioStreamDecoder {
    type Packet = FfmpegPacket;
    type Frame = FfmpegFrame;

    fn time_base(&self) -> Rational {
        self.time_base
    }

    fn decode(
        &mut self,
        packet: &FfmpegPacket,
        frame: &mut FfmpegFrame,
    ) -> Result<Option<FrameSummary>, FramewalkError> {
        let codec: &mut Opened = &mut self.decoder;
        let produced = decode_one(codec, self.stream_index, &packet.0, &mut frame.frame)?;
        Ok(produced.then(|| Self::summarize(frame)))
    }

    fn flush(&mut self, frame: &mut FfmpegFrame) -> Result<Option<FrameSummary>, FramewalkError> {
        let codec: &mut Opened = &mut self.decoder;
        let produced = drain_one(codec, &mut self.draining, self.stream_index, &mut frame.frame)?;
        Ok(produced.then(|| Self::summarize(frame)))
    }
}

/// A decoder tagged with its stream kind.
pub enum FfmpegDecoder {
    Video(VideoStreamDecoder),
    Audio(AudioStreamDecoder),
}

impl FfmpegDecoder {
    fn inner(&mut self) -> &mut dyn StreamDecoder<Packet = FfmpegPacket, Frame = FfmpegFrame> {
        match self {
            FfmpegDecoder::Video(decoder) => decoder,
            FfmpegDecoder::Audio(decoder) => decoder,
        }
    }
}

impl StreamDecoder for FfmpegDecoder {
    type Packet = FfmpegPacket;
    type Frame = FfmpegFrame;

    fn time_base(&self) -> Rational {
        match self {
            FfmpegDecoder::Video(decoder) => decoder.time_base(),
            FfmpegDecoder::Audio(decoder) => decoder.time_base(),
        }
    }

    fn decode(
        &mut self,
        packet: &FfmpegPacket,
        frame: &mut FfmpegFrame,
    ) -> Result<Option<FrameSummary>, FramewalkError> {
        self.inner().decode(packet, frame)
    }

    fn flush(&mut self, frame: &mut FfmpegFrame) -> Result<Option<FrameSummary>, FramewalkError> {
        self.inner().flush(frame)
    }
}
