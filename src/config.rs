//! Pipeline configuration.
//!
//! [`InputOptions`] and [`OutputOptions`] are builders that carry everything
//! an open call needs: backend option strings, forced container formats,
//! pixel format requests and, for outputs, the encoder preference and frame
//! geometry.
//!
//! # Example
//!
//! ```no_run
//! use framepump::{FrameCountPolicy, InputOptions, OutputOptions, Pixel, Rational};
//!
//! let input = InputOptions::new()
//!     .with_pixel_format(Pixel::RGB24)
//!     .with_frame_count(FrameCountPolicy::Compute);
//!
//! let output = OutputOptions::new(Pixel::RGB24, 640, 480, Rational::new(25, 1))
//!     .with_encoder("ffv1")
//!     .with_options("level=3");
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use ffmpeg_next::{Rational, codec::Id as CodecId, format::Pixel};

use crate::progress::ProgressCallback;

/// How an input pipeline determines its frame count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameCountPolicy {
    /// Do not determine a count.
    #[default]
    Skip,
    /// Use the count the container reports, if any.
    Reported,
    /// Use the reported count, decoding the whole stream once when the
    /// container reports none.
    Compute,
}

/// Settings for opening an [`InputPipeline`](crate::InputPipeline).
#[derive(Clone, Default)]
pub struct InputOptions {
    pub(crate) options: String,
    pub(crate) container_format: Option<String>,
    pub(crate) pixel_format: Option<Pixel>,
    pub(crate) frame_count: FrameCountPolicy,
    pub(crate) progress: Option<Arc<dyn ProgressCallback>>,
}

impl Debug for InputOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InputOptions")
            .field("options", &self.options)
            .field("container_format", &self.container_format)
            .field("pixel_format", &self.pixel_format)
            .field("frame_count", &self.frame_count)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl InputOptions {
    /// Defaults: no backend options, probed container format, the
    /// decoder's native pixel format, no frame count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend options as a `key=value:key=value` string.
    ///
    /// They are offered to both the demuxer and the decoder.
    #[must_use]
    pub fn with_options(mut self, options: &str) -> Self {
        self.options = options.to_string();
        self
    }

    /// Force a container format by name instead of probing.
    #[must_use]
    pub fn with_container_format(mut self, name: &str) -> Self {
        self.container_format = Some(name.to_string());
        self
    }

    /// Convert decoded frames to this pixel format.
    ///
    /// [`Pixel::None`] keeps the decoder's native format.
    #[must_use]
    pub fn with_pixel_format(mut self, format: Pixel) -> Self {
        self.pixel_format = Some(format).filter(|&format| format != Pixel::None);
        self
    }

    /// Choose how the frame count is determined.
    #[must_use]
    pub fn with_frame_count(mut self, policy: FrameCountPolicy) -> Self {
        self.frame_count = policy;
        self
    }

    /// Observe the counting pass of [`FrameCountPolicy::Compute`].
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }
}

/// Settings for opening an [`OutputPipeline`](crate::OutputPipeline).
///
/// The source format and geometry describe the frames the caller will
/// write. The encoder works at the same size; only the pixel format may
/// differ.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub(crate) options: String,
    pub(crate) container_format: Option<String>,
    pub(crate) encoder: Option<String>,
    pub(crate) fallback_codec: Option<CodecId>,
    pub(crate) pixel_format: Option<Pixel>,
    pub(crate) source_format: Pixel,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) frame_rate: Rational,
}

impl OutputOptions {
    /// Frames of `source_format` at `width` × `height`, `frame_rate` frames
    /// per second.
    pub fn new(
        source_format: Pixel,
        width: u32,
        height: u32,
        frame_rate: impl Into<Rational>,
    ) -> Self {
        Self {
            options: String::new(),
            container_format: None,
            encoder: None,
            fallback_codec: None,
            pixel_format: None,
            source_format,
            width,
            height,
            frame_rate: frame_rate.into(),
        }
    }

    /// Backend options as a `key=value:key=value` string.
    ///
    /// They are offered to the muxer, the encoder and the header writer.
    #[must_use]
    pub fn with_options(mut self, options: &str) -> Self {
        self.options = options.to_string();
        self
    }

    /// Force a container format by name instead of guessing from the path.
    #[must_use]
    pub fn with_container_format(mut self, name: &str) -> Self {
        self.container_format = Some(name.to_string());
        self
    }

    /// Preferred encoder, by FFmpeg name.
    #[must_use]
    pub fn with_encoder(mut self, name: &str) -> Self {
        self.encoder = Some(name.to_string());
        self
    }

    /// Codec to try when the preferred encoder is missing or rejected by
    /// the container.
    #[must_use]
    pub fn with_fallback_codec(mut self, codec: CodecId) -> Self {
        self.fallback_codec = Some(codec);
        self
    }

    /// Encode in this pixel format. It must be one the encoder supports.
    ///
    /// Without it the supported format closest to the source is chosen.
    #[must_use]
    pub fn with_pixel_format(mut self, format: Pixel) -> Self {
        self.pixel_format = Some(format);
        self
    }

    /// The source pixel format.
    pub fn source_format(&self) -> Pixel {
        self.source_format
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames per second.
    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }
}
