//! Scripted backends shared by the integration tests.
//!
//! Each mock records what the pipeline asked of it in a log shared through
//! `Rc<RefCell<_>>`, so tests can inspect the log after the pipeline has
//! taken ownership of the mock.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use framepump::{
    Demuxer, FfmpegError, FrameDecoder, FrameEncoder, InputParts, Muxer, OutputParts, Packet,
    Pixel, Rational, Received, VideoFrame,
};

pub const WIDTH: u32 = 16;
pub const HEIGHT: u32 = 8;

/// Packet source replaying `(stream index, pts)` pairs.
pub struct ScriptedDemuxer {
    packets: VecDeque<(usize, i64)>,
    fail_when_exhausted: bool,
}

impl ScriptedDemuxer {
    pub fn new(packets: &[(usize, i64)]) -> Self {
        Self {
            packets: packets.iter().copied().collect(),
            fail_when_exhausted: false,
        }
    }

    /// Report a read error instead of a clean end of container.
    pub fn failing_at_end(mut self) -> Self {
        self.fail_when_exhausted = true;
        self
    }
}

impl Demuxer for ScriptedDemuxer {
    fn read_packet(&mut self) -> Result<Option<Packet>, FfmpegError> {
        match self.packets.pop_front() {
            Some((stream, pts)) => {
                let mut packet = Packet::copy(&[stream as u8, pts as u8]);
                packet.set_stream(stream);
                packet.set_pts(Some(pts));
                packet.set_dts(Some(pts));
                Ok(Some(packet))
            }
            None if self.fail_when_exhausted => Err(FfmpegError::InvalidData),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
pub struct DecoderLog {
    /// `(stream index, pts)` of every packet submitted.
    pub packets: Vec<(usize, Option<i64>)>,
    pub eof_sent: bool,
    pub frames_produced: usize,
    pub receive_calls: usize,
}

/// Decoder that emits one frame per `packets_per_frame` packets, stamped
/// with the pts of the packet completing it.
pub struct ScriptedDecoder {
    log: Rc<RefCell<DecoderLog>>,
    format: Pixel,
    packets_per_frame: usize,
    pending: usize,
    ready: VecDeque<i64>,
    eof: bool,
    reject_pts: Option<i64>,
    fail_after_frames: Option<usize>,
}

impl ScriptedDecoder {
    pub fn new(format: Pixel, packets_per_frame: usize) -> (Self, Rc<RefCell<DecoderLog>>) {
        let log = Rc::new(RefCell::new(DecoderLog::default()));
        let decoder = Self {
            log: Rc::clone(&log),
            format,
            packets_per_frame,
            pending: 0,
            ready: VecDeque::new(),
            eof: false,
            reject_pts: None,
            fail_after_frames: None,
        };
        (decoder, log)
    }

    /// Refuse the packet carrying this pts.
    pub fn rejecting(mut self, pts: i64) -> Self {
        self.reject_pts = Some(pts);
        self
    }

    /// Fail hard once this many frames have been produced.
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after_frames = Some(frames);
        self
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn send_packet(&mut self, packet: &Packet) -> Result<(), FfmpegError> {
        self.log
            .borrow_mut()
            .packets
            .push((packet.stream(), packet.pts()));
        if packet.pts().is_some() && packet.pts() == self.reject_pts {
            return Err(FfmpegError::InvalidData);
        }

        self.pending += 1;
        if self.pending == self.packets_per_frame {
            self.pending = 0;
            self.ready.push_back(packet.pts().unwrap_or_default());
        }
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), FfmpegError> {
        self.eof = true;
        self.log.borrow_mut().eof_sent = true;
        Ok(())
    }

    fn receive_frame(
        &mut self,
        frame: &mut VideoFrame,
    ) -> Result<Received<Option<i64>>, FfmpegError> {
        let mut log = self.log.borrow_mut();
        log.receive_calls += 1;

        if self.fail_after_frames == Some(log.frames_produced) {
            return Err(FfmpegError::InvalidData);
        }

        match self.ready.pop_front() {
            Some(timestamp) => {
                *frame = VideoFrame::new(self.format, WIDTH, HEIGHT);
                frame.data_mut(0).fill(log.frames_produced as u8);
                log.frames_produced += 1;
                Ok(Received::Ready(Some(timestamp)))
            }
            None if self.eof => Ok(Received::EndOfStream),
            None => Ok(Received::NeedsInput),
        }
    }
}

/// Input parts over scripted mocks, GRAY8 at `WIDTH` × `HEIGHT`, 25 fps.
pub fn input_parts(
    demuxer: ScriptedDemuxer,
    decoder: ScriptedDecoder,
    stream_index: usize,
) -> InputParts {
    InputParts {
        demuxer: Box::new(demuxer),
        decoder: Box::new(decoder),
        stream_index,
        format: Pixel::GRAY8,
        width: WIDTH,
        height: HEIGHT,
        frame_rate: Rational::new(25, 1),
        time_base: Rational::new(1, 25),
        format_name: "scripted".to_string(),
        reported_frames: 0,
    }
}

/// `count` video packets on stream 0 with pts `0..count`.
pub fn video_packets(count: i64) -> Vec<(usize, i64)> {
    (0..count).map(|pts| (0, pts)).collect()
}

#[derive(Debug, Default)]
pub struct EncoderLog {
    /// pts of every frame submitted.
    pub frames: Vec<Option<i64>>,
    /// Pixel format of every frame submitted.
    pub formats: Vec<Pixel>,
    pub eof_sent: bool,
}

/// Encoder holding back `delay` frames until it is flushed.
pub struct DelayedEncoder {
    log: Rc<RefCell<EncoderLog>>,
    delay: usize,
    queue: VecDeque<Option<i64>>,
    eof: bool,
    fail_eof: bool,
    strip_pts: bool,
}

impl DelayedEncoder {
    pub fn new(delay: usize) -> (Self, Rc<RefCell<EncoderLog>>) {
        let log = Rc::new(RefCell::new(EncoderLog::default()));
        let encoder = Self {
            log: Rc::clone(&log),
            delay,
            queue: VecDeque::new(),
            eof: false,
            fail_eof: false,
            strip_pts: false,
        };
        (encoder, log)
    }

    /// Refuse the end-of-stream signal.
    pub fn failing_eof(mut self) -> Self {
        self.fail_eof = true;
        self
    }

    /// Emit packets without timestamps.
    pub fn stripping_pts(mut self) -> Self {
        self.strip_pts = true;
        self
    }
}

impl FrameEncoder for DelayedEncoder {
    fn send_frame(&mut self, frame: &VideoFrame) -> Result<(), FfmpegError> {
        let mut log = self.log.borrow_mut();
        log.frames.push(frame.pts());
        log.formats.push(frame.format());
        self.queue.push_back(frame.pts());
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), FfmpegError> {
        if self.fail_eof {
            return Err(FfmpegError::InvalidData);
        }
        self.eof = true;
        self.log.borrow_mut().eof_sent = true;
        Ok(())
    }

    fn receive_packet(&mut self, packet: &mut Packet) -> Result<Received<()>, FfmpegError> {
        if self.queue.len() > self.delay || (self.eof && !self.queue.is_empty()) {
            let pts = self.queue.pop_front().flatten();
            *packet = Packet::copy(&[0xAB; 4]);
            if !self.strip_pts {
                packet.set_pts(pts);
                packet.set_dts(pts);
            }
            return Ok(Received::Ready(()));
        }
        if self.eof {
            Ok(Received::EndOfStream)
        } else {
            Ok(Received::NeedsInput)
        }
    }
}

#[derive(Debug, Default)]
pub struct MuxerLog {
    /// `(stream index, pts, dts)` of every packet written.
    pub packets: Vec<(usize, Option<i64>, Option<i64>)>,
    pub flushes: usize,
    pub trailer_written: bool,
}

/// Muxer recording packets, optionally failing some operations.
pub struct RecordingMuxer {
    log: Rc<RefCell<MuxerLog>>,
    flushes_until_done: usize,
    fail_flush: bool,
    fail_writes: bool,
}

impl RecordingMuxer {
    pub fn new() -> (Self, Rc<RefCell<MuxerLog>>) {
        let log = Rc::new(RefCell::new(MuxerLog::default()));
        let muxer = Self {
            log: Rc::clone(&log),
            flushes_until_done: 1,
            fail_flush: false,
            fail_writes: false,
        };
        (muxer, log)
    }

    /// Report buffered data until the `count`-th flush.
    pub fn buffering(mut self, count: usize) -> Self {
        self.flushes_until_done = count;
        self
    }

    pub fn failing_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl Muxer for RecordingMuxer {
    fn write_packet(&mut self, packet: &mut Packet) -> Result<(), FfmpegError> {
        if self.fail_writes {
            return Err(FfmpegError::InvalidData);
        }
        self.log
            .borrow_mut()
            .packets
            .push((packet.stream(), packet.pts(), packet.dts()));
        Ok(())
    }

    fn flush(&mut self) -> Result<bool, FfmpegError> {
        if self.fail_flush {
            return Err(FfmpegError::InvalidData);
        }
        let mut log = self.log.borrow_mut();
        log.flushes += 1;
        Ok(log.flushes >= self.flushes_until_done)
    }

    fn write_trailer(&mut self) -> Result<(), FfmpegError> {
        self.log.borrow_mut().trailer_written = true;
        Ok(())
    }
}

/// Output parts over mocks: codec time base 1/25, stream time base 1/1000.
pub fn output_parts(
    encoder: DelayedEncoder,
    muxer: RecordingMuxer,
    stream_index: usize,
    pixel_format: Pixel,
) -> OutputParts {
    OutputParts {
        encoder: Box::new(encoder),
        muxer: Box::new(muxer),
        stream_index,
        encoder_name: "delayed".to_string(),
        pixel_format,
        codec_time_base: Rational::new(1, 25),
        stream_time_base: Rational::new(1, 1000),
    }
}
