//! The decode pull loop behind an input pipeline.

use std::sync::Arc;

use ffmpeg_next::frame::Video as VideoFrame;

use crate::backend::{Demuxer, FrameDecoder, Received};
use crate::error::PumpError;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};

/// Result of a successful frame read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub enum ReadStatus {
    /// A frame was written into the destination.
    Frame,
    /// The stream is exhausted. Every later read reports this again.
    EndOfStream,
}

/// Demuxer and decoder of one video stream, read strictly forward.
pub(crate) struct FrameCursor {
    demuxer: Box<dyn Demuxer>,
    decoder: Box<dyn FrameDecoder>,
    stream_index: usize,
    flushing: bool,
}

impl FrameCursor {
    pub(crate) fn new(
        demuxer: Box<dyn Demuxer>,
        decoder: Box<dyn FrameDecoder>,
        stream_index: usize,
    ) -> Self {
        Self {
            demuxer,
            decoder,
            stream_index,
            flushing: false,
        }
    }

    pub(crate) fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Decode the next frame of the selected stream into `frame`.
    ///
    /// The frame's pts is set to the decoder's best-effort timestamp.
    pub(crate) fn next_frame(&mut self, frame: &mut VideoFrame) -> Result<ReadStatus, PumpError> {
        loop {
            let received = self
                .decoder
                .receive_frame(frame)
                .map_err(|error| PumpError::Decode(error.to_string()))?;

            match received {
                Received::Ready(timestamp) => {
                    frame.set_pts(timestamp);
                    return Ok(ReadStatus::Frame);
                }
                Received::EndOfStream => return Ok(ReadStatus::EndOfStream),
                // Flushed decoders should answer EOF, but some keep asking.
                Received::NeedsInput if self.flushing => return Ok(ReadStatus::EndOfStream),
                Received::NeedsInput => self.feed_decoder(),
            }
        }
    }

    /// Submit the next packet of the selected stream, or enter flushing
    /// once the container has no more.
    fn feed_decoder(&mut self) {
        loop {
            match self.demuxer.read_packet() {
                Ok(Some(packet)) if packet.stream() != self.stream_index => continue,
                Ok(Some(packet)) => {
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        log::warn!(
                            "Decoder rejected packet (pts {:?}) of stream {}: {error}",
                            packet.pts(),
                            self.stream_index,
                        );
                    }
                    return;
                }
                Ok(None) => break,
                Err(error) => {
                    log::warn!("Packet read failed, treating container as exhausted: {error}");
                    break;
                }
            }
        }

        self.flushing = true;
        if let Err(error) = self.decoder.send_eof() {
            log::debug!("Decoder refused end-of-stream signal: {error}");
        }
    }

    /// Decode and discard up to `count` frames.
    ///
    /// Stops early at end of stream or on a decode error, which is logged.
    /// Returns the number of frames actually discarded.
    pub(crate) fn skip(
        &mut self,
        count: u64,
        operation: OperationType,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> u64 {
        if count == 0 {
            return 0;
        }

        let total = (operation == OperationType::Seeking).then_some(count);
        let mut tracker = progress.map(|callback| ProgressTracker::new(callback, operation, total));
        let mut scratch = VideoFrame::empty();
        let mut skipped = 0;

        while skipped < count {
            match self.next_frame(&mut scratch) {
                Ok(ReadStatus::Frame) => {
                    skipped += 1;
                    if let Some(tracker) = tracker.as_mut() {
                        tracker.advance();
                    }
                }
                Ok(ReadStatus::EndOfStream) => break,
                Err(error) => {
                    log::warn!("Stopped skipping after {skipped} frames: {error}");
                    break;
                }
            }
        }

        if let Some(tracker) = tracker.as_ref() {
            tracker.finish();
        }
        skipped
    }
}
