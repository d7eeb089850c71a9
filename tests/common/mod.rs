//! Scripted in-memory media source for driving the decode loop without
//! FFmpeg fixtures.
//!
//! Every acquisition and release is written to a shared [`Journal`] so tests
//! can check routing, decode counts and teardown order.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    io::{self, Write},
    path::{Path, PathBuf},
    process::Command,
    rc::Rc,
    sync::OnceLock,
};

use framewalk::{
    FrameBuffer, FrameSummary, FramewalkError, MediaKind, MediaSource, Rational, SourcePacket,
    StreamDecoder, StreamDescriptor,
};

#[derive(Debug, Default)]
pub struct Journal {
    /// Acquisition and release events, in order.
    pub events: Vec<String>,
    /// Packets each decoder received, by stream index.
    pub decode_calls: HashMap<usize, u64>,
    /// Timestamps as they arrived at each decoder, after rescaling.
    pub decoded_pts: Vec<(usize, Option<i64>)>,
    /// Number of frame buffer resets.
    pub frame_resets: u64,
}

impl Journal {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.as_str() == event).count()
    }

    /// Release events only, in order.
    pub fn releases(&self) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.ends_with("closed") || e.ends_with("released"))
            .cloned()
            .collect()
    }
}

pub type SharedJournal = Rc<RefCell<Journal>>;

pub fn journal() -> SharedJournal {
    Rc::new(RefCell::new(Journal::default()))
}

/// What happens when the driver asks for a stream's decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opens,
    Unsupported,
    InitFails,
}

#[derive(Debug, Clone)]
pub struct ScriptedStream {
    pub descriptor: StreamDescriptor,
    pub open: OpenOutcome,
    /// Packets a decoder holds back before its first frame.
    pub delay: usize,
    pub decoder_time_base: Rational,
}

impl ScriptedStream {
    pub fn new(index: usize, kind: MediaKind) -> Self {
        Self {
            descriptor: StreamDescriptor {
                index,
                kind,
                codec: format!("scripted-{kind}"),
                time_base: Rational::new(1, 1000),
            },
            open: OpenOutcome::Opens,
            delay: 0,
            decoder_time_base: Rational::new(1, 1000),
        }
    }

    pub fn with_open(mut self, open: OpenOutcome) -> Self {
        self.open = open;
        self
    }

    pub fn with_delay(mut self, delay: usize) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_time_bases(mut self, stream: Rational, decoder: Rational) -> Self {
        self.descriptor.time_base = stream;
        self.decoder_time_base = decoder;
        self
    }
}

#[derive(Debug, Clone)]
enum Read {
    Packet(ScriptedPacket),
    Failure,
}

pub struct ScriptedSource {
    streams: Vec<ScriptedStream>,
    reads: VecDeque<Read>,
    frame_allocation_fails: bool,
    journal: SharedJournal,
}

impl ScriptedSource {
    pub fn new(journal: &SharedJournal) -> Self {
        journal.borrow_mut().events.push("container opened".to_string());
        Self {
            streams: Vec::new(),
            reads: VecDeque::new(),
            frame_allocation_fails: false,
            journal: Rc::clone(journal),
        }
    }

    pub fn stream(mut self, stream: ScriptedStream) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn video(self, index: usize) -> Self {
        self.stream(ScriptedStream::new(index, MediaKind::Video))
    }

    pub fn audio(self, index: usize) -> Self {
        self.stream(ScriptedStream::new(index, MediaKind::Audio))
    }

    pub fn other(self, index: usize) -> Self {
        self.stream(ScriptedStream::new(index, MediaKind::Other))
    }

    /// Queue one packet per entry, timestamps counting up per stream in the
    /// stream's own time base.
    pub fn packets(mut self, stream_indices: &[usize]) -> Self {
        let mut next_pts: HashMap<usize, i64> = HashMap::new();
        for &stream_index in stream_indices {
            let step = self.pts_step(stream_index);
            let pts = next_pts.entry(stream_index).or_insert(0);
            self.reads.push_back(Read::Packet(ScriptedPacket {
                stream_index,
                pts: Some(*pts),
                corrupt: false,
                fatal: false,
            }));
            *pts += step;
        }
        self
    }

    /// Queue a packet the decoder will reject.
    pub fn corrupt_packet(mut self, stream_index: usize) -> Self {
        self.reads.push_back(Read::Packet(ScriptedPacket {
            stream_index,
            pts: None,
            corrupt: true,
            fatal: false,
        }));
        self
    }

    /// Queue a packet on which the decoder fails beyond recovery.
    pub fn fatal_packet(mut self, stream_index: usize) -> Self {
        self.reads.push_back(Read::Packet(ScriptedPacket {
            stream_index,
            pts: None,
            corrupt: false,
            fatal: true,
        }));
        self
    }

    /// Queue a read failure that is not end of stream.
    pub fn read_failure(mut self) -> Self {
        self.reads.push_back(Read::Failure);
        self
    }

    pub fn failing_frame_allocation(mut self) -> Self {
        self.frame_allocation_fails = true;
        self
    }

    // One decoder tick expressed in the stream time base.
    fn pts_step(&self, stream_index: usize) -> i64 {
        self.streams
            .iter()
            .find(|s| s.descriptor.index == stream_index)
            .map(|s| {
                let stream = s.descriptor.time_base;
                let decoder = s.decoder_time_base;
                i64::from(decoder.numerator()) * i64::from(stream.denominator())
                    / (i64::from(decoder.denominator()) * i64::from(stream.numerator()))
            })
            .unwrap_or(1)
            .max(1)
    }
}

impl Drop for ScriptedSource {
    fn drop(&mut self) {
        self.journal
            .borrow_mut()
            .events
            .push("container closed".to_string());
    }
}

impl MediaSource for ScriptedSource {
    type Packet = ScriptedPacket;
    type Frame = ScriptedFrame;
    type Decoder = ScriptedDecoder;

    fn streams(&self) -> Vec<StreamDescriptor> {
        self.streams.iter().map(|s| s.descriptor.clone()).collect()
    }

    fn open_decoder(
        &mut self,
        stream: &StreamDescriptor,
    ) -> Result<ScriptedDecoder, FramewalkError> {
        let script = self
            .streams
            .iter()
            .find(|s| s.descriptor.index == stream.index)
            .cloned()
            .expect("descriptor comes from this source");

        match script.open {
            OpenOutcome::Unsupported => {
                return Err(FramewalkError::UnsupportedCodec {
                    stream_index: stream.index,
                    codec: stream.codec.clone(),
                });
            }
            OpenOutcome::InitFails => {
                return Err(FramewalkError::DecoderInit {
                    stream_index: stream.index,
                    reason: "scripted failure".to_string(),
                });
            }
            OpenOutcome::Opens => {}
        }

        self.journal
            .borrow_mut()
            .events
            .push(format!("decoder {} opened", stream.index));

        Ok(ScriptedDecoder {
            stream_index: stream.index,
            kind: stream.kind,
            time_base: script.decoder_time_base,
            delay: script.delay,
            pending: VecDeque::new(),
            journal: Rc::clone(&self.journal),
        })
    }

    fn allocate_frame(&self) -> Result<ScriptedFrame, FramewalkError> {
        if self.frame_allocation_fails {
            return Err(FramewalkError::FrameAllocation);
        }
        self.journal
            .borrow_mut()
            .events
            .push("frame allocated".to_string());
        Ok(ScriptedFrame {
            journal: Rc::clone(&self.journal),
        })
    }

    fn read_packet(&mut self) -> Result<Option<ScriptedPacket>, FramewalkError> {
        match self.reads.pop_front() {
            Some(Read::Packet(packet)) => Ok(Some(packet)),
            Some(Read::Failure) => Err(FramewalkError::FfmpegError("I/O error".to_string())),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedPacket {
    stream_index: usize,
    pts: Option<i64>,
    corrupt: bool,
    fatal: bool,
}

impl SourcePacket for ScriptedPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn rescale_ts(&mut self, from: Rational, to: Rational) {
        self.pts = self.pts.map(|pts| {
            pts * i64::from(from.numerator()) * i64::from(to.denominator())
                / (i64::from(from.denominator()) * i64::from(to.numerator()))
        });
    }
}

pub struct ScriptedFrame {
    journal: SharedJournal,
}

impl FrameBuffer for ScriptedFrame {
    fn reset(&mut self) {
        self.journal.borrow_mut().frame_resets += 1;
    }
}

impl Drop for ScriptedFrame {
    fn drop(&mut self) {
        self.journal
            .borrow_mut()
            .events
            .push("frame released".to_string());
    }
}

pub struct ScriptedDecoder {
    stream_index: usize,
    kind: MediaKind,
    time_base: Rational,
    delay: usize,
    pending: VecDeque<Option<i64>>,
    journal: SharedJournal,
}

impl ScriptedDecoder {
    fn summary(&self, pts: Option<i64>) -> FrameSummary {
        match self.kind {
            MediaKind::Audio => FrameSummary::Audio {
                samples: 1024,
                channels: 2,
                pts,
            },
            _ => FrameSummary::Video {
                width: 320,
                height: 240,
                sample_aspect_ratio: Rational::new(1, 1),
                pts,
            },
        }
    }
}

impl StreamDecoder for ScriptedDecoder {
    type Packet = ScriptedPacket;
    type Frame = ScriptedFrame;

    fn time_base(&self) -> Rational {
        self.time_base
    }

    fn decode(
        &mut self,
        packet: &ScriptedPacket,
        _frame: &mut ScriptedFrame,
    ) -> Result<Option<FrameSummary>, FramewalkError> {
        {
            let mut journal = self.journal.borrow_mut();
            *journal.decode_calls.entry(self.stream_index).or_insert(0) += 1;
            journal.decoded_pts.push((self.stream_index, packet.pts));
        }

        if packet.fatal {
            return Err(FramewalkError::FfmpegError("decoder state lost".to_string()));
        }
        if packet.corrupt {
            return Err(FramewalkError::PacketDecode {
                stream_index: self.stream_index,
                reason: "Invalid data found when processing input".to_string(),
            });
        }

        self.pending.push_back(packet.pts);
        if self.pending.len() > self.delay {
            let pts = self.pending.pop_front().flatten();
            return Ok(Some(self.summary(pts)));
        }
        Ok(None)
    }

    fn flush(&mut self, _frame: &mut ScriptedFrame) -> Result<Option<FrameSummary>, FramewalkError> {
        Ok(self
            .pending
            .pop_front()
            .map(|pts| self.summary(pts)))
    }
}

impl Drop for ScriptedDecoder {
    fn drop(&mut self) {
        self.journal
            .borrow_mut()
            .events
            .push(format!("decoder {} closed", self.stream_index));
    }
}

/// A writer that fails every write.
pub struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Number of frame blocks of each kind in a report.
pub fn block_counts(output: &str) -> (usize, usize) {
    (
        output.matches("Video : frame->width, height :").count(),
        output.matches("Audio : frame->nb_samples :").count(),
    )
}

/// Path of a media fixture under `tests/fixtures`.
///
/// Missing fixtures are generated once per test binary with
/// `generate_fixtures.sh` when the `ffmpeg` CLI is available. Returns `None`
/// after noting the skip on stderr when the fixture still does not exist.
pub fn media_fixture(name: &str) -> Option<PathBuf> {
    static GENERATED: OnceLock<bool> = OnceLock::new();

    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let path = fixtures.join(name);
    if !path.exists() && !*GENERATED.get_or_init(|| generate_fixtures(&fixtures)) {
        eprintln!("skipping: {name} is missing and the ffmpeg CLI could not generate it");
        return None;
    }
    if !path.exists() {
        eprintln!("skipping: {name} was not produced by generate_fixtures.sh");
        return None;
    }
    Some(path)
}

fn generate_fixtures(fixtures: &Path) -> bool {
    let ffmpeg_available = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .is_ok_and(|output| output.status.success());
    if !ffmpeg_available {
        return false;
    }

    Command::new("sh")
        .arg(fixtures.join("generate_fixtures.sh"))
        .status()
        .is_ok_and(|status| status.success())
}
