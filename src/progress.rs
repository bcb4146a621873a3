//! Progress reporting for long-running frame loops.
//!
//! Seeking, frame counting and [`pump`](crate::pump) may walk through many
//! frames before returning. Attach a [`ProgressCallback`] to observe them.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepump::{InputOptions, InputPipeline, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         match info.percentage {
//!             Some(pct) => println!("[{:?}] {pct:.1}% complete", info.operation),
//!             None => println!("[{:?}] {} frames", info.operation, info.current),
//!         }
//!     }
//! }
//!
//! framepump::init(framepump::FfmpegLogLevel::Error)?;
//! let mut input = InputPipeline::open("input.mkv", &InputOptions::new())?;
//! let skipped = input.seek_frame(250, Some(Arc::new(PrintProgress)));
//! # Ok::<(), framepump::PumpError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The kind of frame loop currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding and discarding frames to reach a frame index.
    Seeking,
    /// Decoding a whole stream to count its frames.
    Counting,
    /// Moving frames from an input pipeline to an output pipeline.
    Pumping,
}

/// A snapshot of loop progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many frames have been processed so far.
    pub current: u64,
    /// Total frames expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving progress updates.
///
/// Callbacks observe the loop but cannot stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called once per processed frame and once more when the loop ends.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one processed frame and report it.
    pub(crate) fn advance(&mut self) {
        self.current += 1;
        self.report();
    }

    /// Emit a final report.
    pub(crate) fn finish(&self) {
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
        });
    }
}
