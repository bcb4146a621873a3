//! Error types for the `framepump` crate.
//!
//! This module defines [`PumpError`], the unified error type returned by all
//! fallible operations in the crate. Errors carry the context needed to tell
//! an open failure from a negotiation failure or a per-frame codec failure.
//!
//! Reaching the end of an input stream is **not** an error: it is reported
//! as [`ReadStatus::EndOfStream`](crate::ReadStatus::EndOfStream).

use std::path::PathBuf;

use ffmpeg_next::format::Pixel;
use thiserror::Error;

/// The unified error type for all `framepump` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PumpError {
    /// FFmpeg could not be initialised.
    #[error("FFmpeg initialisation failed: {0}")]
    Init(String),

    /// A container could not be opened, probed, or its decoder opened.
    #[error("Failed to open media file at {path}: {reason}")]
    Open {
        /// Path passed to the open call.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// A forced container format name is not known to the backend.
    #[error("Unknown container format: {0}")]
    UnknownContainerFormat(String),

    /// The input container has no decodable video stream.
    #[error("No video stream found in {path}")]
    NoVideoStream {
        /// Path of the input container.
        path: PathBuf,
    },

    /// No encoder is acceptable for the output container.
    #[error("No usable video encoder for {path}")]
    NoEncoder {
        /// Path of the output container.
        path: PathBuf,
    },

    /// The requested pixel format is not accepted by the chosen encoder.
    #[error("Pixel format {format:?} is not supported by encoder {encoder}")]
    UnsupportedPixelFormat {
        /// The requested pixel format.
        format: Pixel,
        /// Name of the encoder that rejected it.
        encoder: String,
    },

    /// A pixel format name or identifier has no descriptor.
    #[error("Unknown pixel format: {0}")]
    UnknownPixelFormat(String),

    /// A backend option string could not be parsed.
    #[error("Invalid option string: {0}")]
    InvalidOptions(String),

    /// The decoder reported a hard failure.
    #[error("Failed to decode video frame: {0}")]
    Decode(String),

    /// The encoder or muxer reported a hard failure.
    #[error("Failed to encode video frame: {0}")]
    Encode(String),

    /// Pixel-format conversion failed.
    #[error("Pixel conversion failed: {0}")]
    Conversion(String),

    /// A frame buffer could not be allocated or made writable.
    #[error("Frame allocation failed: {0}")]
    Allocation(String),

    /// Flushing or finalising an output pipeline failed.
    #[error("Failed to finalise output: {0}")]
    Flush(String),

    /// Frames produced by an input pipeline do not fit an output pipeline.
    #[error("Input frames are {input}, output expects {output}")]
    GeometryMismatch {
        /// Format and size produced by the input.
        input: String,
        /// Format and size expected by the output.
        output: String,
    },
}
