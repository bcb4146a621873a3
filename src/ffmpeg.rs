//! Process-wide FFmpeg setup and log level configuration.
//!
//! FFmpeg keeps global state (its own logger and, on older builds, the codec
//! and format registries). Rather than touching that state implicitly from
//! every open call, `framepump` exposes [`init`], which must be called once
//! before the first pipeline is opened.
//!
//! FFmpeg's internal logging is separate from the Rust
//! [`log`](https://crates.io/crates/log) records this crate emits. The level
//! set here only controls what FFmpeg itself prints to stderr.
//!
//! # Example
//!
//! ```no_run
//! use framepump::FfmpegLogLevel;
//!
//! framepump::init(FfmpegLogLevel::Error)?;
//! # Ok::<(), framepump::PumpError>(())
//! ```

use ffmpeg_next::util::log::Level;

use crate::error::PumpError;

/// FFmpeg internal log verbosity level.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants. Setting a level causes
/// FFmpeg to suppress all messages below that severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only conditions the process cannot recover from.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }

    fn from_ffmpeg_level(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }
}

/// Initialise FFmpeg and set its log level.
///
/// Call once at process start, before opening any pipeline. Calling it
/// again is harmless and only changes the log level.
///
/// # Errors
///
/// Returns [`PumpError::Init`] if FFmpeg fails to initialise.
pub fn init(level: FfmpegLogLevel) -> Result<(), PumpError> {
    ffmpeg_next::init().map_err(|error| PumpError::Init(error.to_string()))?;
    set_ffmpeg_log_level(level);
    log::debug!("FFmpeg initialised (log level {level:?})");
    Ok(())
}

/// Set the FFmpeg internal log verbosity level.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Get the current FFmpeg internal log verbosity level.
///
/// Returns `None` if the current level does not map to a known variant.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from_ffmpeg_level)
}
