//! The media backend contract.
//!
//! The pipelines never talk to FFmpeg directly while pumping frames. They
//! drive five small traits: a [`Demuxer`] yielding packets, a
//! [`FrameDecoder`] and [`FrameEncoder`] exposing codec queues, a [`Muxer`]
//! accepting packets, and a [`Scaler`] converting pixel data. The FFmpeg
//! implementations live in [`ffmpeg`]; callers may supply their own through
//! [`InputParts`](crate::InputParts) and [`OutputParts`](crate::OutputParts).
//!
//! Codec queues distinguish three outcomes when polled, see [`Received`]:
//! something was produced, the codec needs more input first, or the codec
//! has been drained completely. Anything else is a hard failure and is
//! returned as an error.

use ffmpeg_next::{Error as FfmpegError, Packet, frame::Video as VideoFrame};

pub mod ffmpeg;

/// Outcome of polling a codec output queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received<T> {
    /// An item was produced.
    Ready(T),
    /// Nothing is ready until more input is submitted.
    NeedsInput,
    /// The codec was flushed and has nothing left.
    EndOfStream,
}

/// Source of compressed packets from a container.
pub trait Demuxer {
    /// Read the next packet of any stream, or `None` once the container is
    /// exhausted.
    fn read_packet(&mut self) -> Result<Option<Packet>, FfmpegError>;
}

/// Stateful video decoder.
pub trait FrameDecoder {
    /// Submit one compressed packet.
    fn send_packet(&mut self, packet: &Packet) -> Result<(), FfmpegError>;

    /// Signal end of input so buffered frames can be drained.
    fn send_eof(&mut self) -> Result<(), FfmpegError>;

    /// Poll for a decoded frame.
    ///
    /// On [`Received::Ready`] the frame has been written into `frame` and the
    /// value is the decoder's best-effort timestamp for it.
    fn receive_frame(&mut self, frame: &mut VideoFrame)
    -> Result<Received<Option<i64>>, FfmpegError>;
}

/// Stateful video encoder.
pub trait FrameEncoder {
    /// Submit one raw frame.
    fn send_frame(&mut self, frame: &VideoFrame) -> Result<(), FfmpegError>;

    /// Signal end of input so buffered packets can be drained.
    fn send_eof(&mut self) -> Result<(), FfmpegError>;

    /// Poll for an encoded packet, written into `packet` on
    /// [`Received::Ready`].
    fn receive_packet(&mut self, packet: &mut Packet) -> Result<Received<()>, FfmpegError>;
}

/// Sink of compressed packets into a container whose header is written.
pub trait Muxer {
    /// Write one packet. Timestamps are already in the stream time base.
    fn write_packet(&mut self, packet: &mut Packet) -> Result<(), FfmpegError>;

    /// Flush data buffered inside the muxer.
    ///
    /// Returns `true` once nothing is left to flush.
    fn flush(&mut self) -> Result<bool, FfmpegError>;

    /// Write the container trailer.
    fn write_trailer(&mut self) -> Result<(), FfmpegError>;
}

/// Pixel-format converter bound to fixed source and destination geometry.
pub trait Scaler {
    /// Convert the pixel data of `source` into `destination`.
    fn scale(&mut self, source: &VideoFrame, destination: &mut VideoFrame)
    -> Result<(), FfmpegError>;
}
