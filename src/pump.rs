//! Frame transfer between an input and an output pipeline.

use std::sync::Arc;

use crate::cursor::ReadStatus;
use crate::error::PumpError;
use crate::input::InputPipeline;
use crate::output::OutputPipeline;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};

/// Read frames from `input` and write them to `output` until the input
/// ends or `limit` frames have been moved.
///
/// The output is left open; call [`OutputPipeline::close`] afterwards.
/// Returns the number of frames moved.
///
/// # Errors
///
/// - [`PumpError::GeometryMismatch`] if the input's pixel format or size
///   differs from the output's source format or size. Nothing is read.
/// - Any error of [`InputPipeline::read_frame`] or
///   [`OutputPipeline::write_frame`].
///
/// # Example
///
/// ```no_run
/// use framepump::{InputOptions, InputPipeline, OutputOptions, OutputPipeline};
///
/// framepump::init(framepump::FfmpegLogLevel::Error)?;
/// let mut input = InputPipeline::open("input.mkv", &InputOptions::new())?;
/// let options = OutputOptions::new(
///     input.pixel_format(),
///     input.width(),
///     input.height(),
///     input.frame_rate(),
/// );
/// let mut output = OutputPipeline::open("copy.mkv", &options)?;
///
/// let moved = framepump::pump(&mut input, &mut output, None, None)?;
/// output.close()?;
/// println!("{moved} frames");
/// # Ok::<(), framepump::PumpError>(())
/// ```
pub fn pump(
    input: &mut InputPipeline,
    output: &mut OutputPipeline,
    limit: Option<u64>,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<u64, PumpError> {
    let produced = (input.pixel_format(), input.width(), input.height());
    let expected = (output.source_format(), output.width(), output.height());
    if produced != expected {
        return Err(PumpError::GeometryMismatch {
            input: format!("{}x{} {:?}", produced.1, produced.2, produced.0),
            output: format!("{}x{} {:?}", expected.1, expected.2, expected.0),
        });
    }

    let total = limit.or(input.frame_count());
    let mut tracker =
        progress.map(|callback| ProgressTracker::new(callback, OperationType::Pumping, total));

    let mut frame = input.allocate_frame()?;
    let mut moved = 0;

    while limit.is_none_or(|limit| moved < limit) {
        match input.read_frame(&mut frame)? {
            ReadStatus::EndOfStream => break,
            ReadStatus::Frame => {
                output.write_frame(&mut frame)?;
                moved += 1;
                if let Some(tracker) = tracker.as_mut() {
                    tracker.advance();
                }
            }
        }
    }

    if let Some(tracker) = tracker.as_ref() {
        tracker.finish();
    }
    log::debug!("Pumped {moved} frames");
    Ok(moved)
}
