//! Lazy, pull-based frame iterator.
//!
//! [`Frames`] implements [`Iterator`] over an [`InputPipeline`]: each call to
//! [`next()`](Iterator::next) decodes just enough packets to produce the
//! next frame, in a freshly allocated buffer.
//!
//! # Example
//!
//! ```no_run
//! use framepump::{InputOptions, InputPipeline};
//!
//! framepump::init(framepump::FfmpegLogLevel::Error)?;
//! let mut input = InputPipeline::open("input.mkv", &InputOptions::new())?;
//!
//! for frame in input.frames().take(10) {
//!     let frame = frame?;
//!     println!("{}x{} at {:?}", frame.width(), frame.height(), frame.pts());
//! }
//! # Ok::<(), framepump::PumpError>(())
//! ```

use ffmpeg_next::frame::Video as VideoFrame;

use crate::cursor::ReadStatus;
use crate::error::PumpError;
use crate::input::InputPipeline;

/// Iterator over the remaining frames of an input pipeline.
///
/// Ends after end of stream or after yielding the first error. The iterator
/// borrows the pipeline mutably; dropping it releases the pipeline at its
/// current position.
///
/// Created via [`InputPipeline::frames`].
pub struct Frames<'a> {
    pipeline: &'a mut InputPipeline,
    done: bool,
}

impl<'a> Frames<'a> {
    pub(crate) fn new(pipeline: &'a mut InputPipeline) -> Self {
        Self {
            pipeline,
            done: false,
        }
    }
}

impl Iterator for Frames<'_> {
    type Item = Result<VideoFrame, PumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.pipeline.allocate_frame().and_then(|mut frame| {
            self.pipeline
                .read_frame(&mut frame)
                .map(|status| (status, frame))
        });

        match result {
            Ok((ReadStatus::Frame, frame)) => Some(Ok(frame)),
            Ok((ReadStatus::EndOfStream, _)) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(error))
            }
        }
    }
}
