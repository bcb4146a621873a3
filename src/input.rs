//! Decoding side: open a container and read frames from its video stream.
//!
//! An [`InputPipeline`] owns the demuxer and decoder of one video stream
//! and, when a pixel format was requested, a converter from the decoder's
//! native format. Frames are read strictly forward; seeking decodes and
//! discards.
//!
//! # Example
//!
//! ```no_run
//! use framepump::{InputOptions, InputPipeline, Pixel, ReadStatus};
//!
//! framepump::init(framepump::FfmpegLogLevel::Error)?;
//! let options = InputOptions::new().with_pixel_format(Pixel::RGB24);
//! let mut input = InputPipeline::open("input.mkv", &options)?;
//!
//! let mut frame = input.allocate_frame()?;
//! while input.read_frame(&mut frame)? == ReadStatus::Frame {
//!     println!("frame at {:?}", frame.pts());
//! }
//! # Ok::<(), framepump::PumpError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use ffmpeg_next::{Rational, format::Pixel, frame::Video as VideoFrame};

use crate::backend::{Demuxer, FrameDecoder, ffmpeg};
use crate::config::{FrameCountPolicy, InputOptions};
use crate::conversion::{ConverterBinding, PixelConversion};
use crate::cursor::{FrameCursor, ReadStatus};
use crate::descriptor::{FormatDescriptor, PlaneLayout};
use crate::error::PumpError;
use crate::frame::{FrameShape, allocate_frame};
use crate::iterator::Frames;
use crate::progress::{OperationType, ProgressCallback};

/// An opened demuxer and decoder with the facts an input pipeline needs.
///
/// Produced by [`InputPipeline::open`] internally; build one by hand to run
/// a pipeline over a custom backend with [`InputPipeline::open_with`].
pub struct InputParts {
    /// Packet source.
    pub demuxer: Box<dyn Demuxer>,
    /// Decoder of the selected stream.
    pub decoder: Box<dyn FrameDecoder>,
    /// Index of the selected stream inside the container.
    pub stream_index: usize,
    /// The decoder's native pixel format.
    pub format: Pixel,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate of the stream.
    pub frame_rate: Rational,
    /// Time base of the stream.
    pub time_base: Rational,
    /// Short name of the container format, e.g. `"matroska,webm"`.
    pub format_name: String,
    /// Frame count stored in the container, `0` when unknown.
    pub reported_frames: u64,
}

/// A readable video stream.
pub struct InputPipeline {
    cursor: FrameCursor,
    conversion: Option<PixelConversion>,
    native: FormatDescriptor,
    descriptor: FormatDescriptor,
    layout: PlaneLayout,
    width: u32,
    height: u32,
    frame_rate: Rational,
    time_base: Rational,
    format_name: String,
    frame_count: Option<u64>,
}

/// Container formats that hold exactly one picture.
///
/// Image demuxers are `image2` and the per-codec `*_pipe` demuxers, except
/// `image2pipe`, which reads a stream of concatenated images.
pub fn is_single_image_format(format_name: &str) -> bool {
    format_name == "image2" || (format_name.ends_with("_pipe") && format_name != "image2pipe")
}

/// Count the decodable frames of a file's best video stream.
///
/// Decodes the whole stream once. The file is opened with its own demuxer
/// and decoder, which are closed again before returning.
///
/// # Errors
///
/// Fails like [`InputPipeline::open`] when the file cannot be opened.
/// Decode failures while counting end the count early instead.
pub fn count_frames<P: AsRef<Path>>(
    path: P,
    options: &InputOptions,
) -> Result<u64, PumpError> {
    let path = path.as_ref();
    count_frames_with(
        || ffmpeg::open_input_parts(path, options),
        options.progress.clone(),
    )
}

/// Count frames of an input produced by `open_parts`.
///
/// See [`count_frames`].
pub fn count_frames_with<F>(
    open_parts: F,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<u64, PumpError>
where
    F: FnOnce() -> Result<InputParts, PumpError>,
{
    let parts = open_parts()?;
    let mut cursor = FrameCursor::new(parts.demuxer, parts.decoder, parts.stream_index);
    let counted = cursor.skip(u64::MAX, OperationType::Counting, progress);
    log::debug!("Counted {counted} frames by decoding");
    Ok(counted)
}

impl InputPipeline {
    /// Open a file and its best video stream.
    ///
    /// With [`FrameCountPolicy::Compute`] and no count stored in the
    /// container, the file is opened twice: once to count frames by
    /// decoding, then again for reading. The returned pipeline is always
    /// positioned at the first frame.
    ///
    /// # Errors
    ///
    /// - [`PumpError::InvalidOptions`] if the option string cannot be parsed.
    /// - [`PumpError::UnknownContainerFormat`] if a forced format is unknown.
    /// - [`PumpError::Open`] if the file cannot be opened or probed, or its
    ///   decoder cannot be opened.
    /// - [`PumpError::NoVideoStream`] if the file has no video stream.
    /// - [`PumpError::UnknownPixelFormat`] or [`PumpError::Conversion`] if
    ///   the requested pixel format cannot be produced.
    pub fn open<P: AsRef<Path>>(path: P, options: &InputOptions) -> Result<Self, PumpError> {
        let path = path.as_ref();
        log::debug!("Opening input {:?} ({:?})", path, options);
        Self::open_with(|| ffmpeg::open_input_parts(path, options), options)
    }

    /// Open a pipeline over parts produced by `open_parts`.
    ///
    /// `open_parts` is called a second time when the frame count has to be
    /// computed; every call must yield a fresh input positioned at its start.
    /// The backend options and container format of `options` are ignored.
    pub fn open_with<F>(mut open_parts: F, options: &InputOptions) -> Result<Self, PumpError>
    where
        F: FnMut() -> Result<InputParts, PumpError>,
    {
        let mut parts = open_parts()?;

        let frame_count = match options.frame_count {
            FrameCountPolicy::Skip => None,
            FrameCountPolicy::Reported => reported_frame_count(&parts),
            FrameCountPolicy::Compute => match reported_frame_count(&parts) {
                Some(count) => Some(count),
                None => {
                    let counted = count_frames_with(|| Ok(parts), options.progress.clone())?;
                    parts = open_parts()?;
                    Some(counted)
                }
            },
        };

        Self::assemble(parts, options.pixel_format, frame_count)
    }

    fn assemble(
        parts: InputParts,
        pixel_format: Option<Pixel>,
        frame_count: Option<u64>,
    ) -> Result<Self, PumpError> {
        let native = FormatDescriptor::resolve(parts.format)?;

        let conversion = match pixel_format {
            Some(requested) if requested != parts.format => {
                Some(PixelConversion::for_decoder(ConverterBinding {
                    source: parts.format,
                    destination: requested,
                    width: parts.width,
                    height: parts.height,
                })?)
            }
            _ => None,
        };
        let descriptor = match &conversion {
            Some(conversion) => FormatDescriptor::resolve(conversion.binding().destination)?,
            None => native,
        };

        log::debug!(
            "Input pipeline ready: {}x{} {:?}{}, {} frames",
            parts.width,
            parts.height,
            native.format,
            match &conversion {
                Some(conversion) => format!(" -> {:?}", conversion.binding().destination),
                None => String::new(),
            },
            frame_count.map_or_else(|| "unknown".to_string(), |count| count.to_string()),
        );

        Ok(Self {
            cursor: FrameCursor::new(parts.demuxer, parts.decoder, parts.stream_index),
            conversion,
            native,
            layout: descriptor.plane_layout(parts.width, parts.height),
            descriptor,
            width: parts.width,
            height: parts.height,
            frame_rate: parts.frame_rate,
            time_base: parts.time_base,
            format_name: parts.format_name,
            frame_count,
        })
    }

    /// Decode the next frame into `frame`.
    ///
    /// On [`ReadStatus::Frame`], `frame` holds the picture in
    /// [`pixel_format`](Self::pixel_format) and its pts is the decoder's
    /// best-effort timestamp in [`time_base`](Self::time_base) units.
    /// Packets of other streams are discarded. Once the stream is exhausted
    /// every call reports [`ReadStatus::EndOfStream`].
    ///
    /// # Errors
    ///
    /// - [`PumpError::Decode`] if the decoder fails while producing a frame.
    /// - [`PumpError::Conversion`] if pixel conversion fails.
    pub fn read_frame(&mut self, frame: &mut VideoFrame) -> Result<ReadStatus, PumpError> {
        match self.conversion.as_mut() {
            None => self.cursor.next_frame(frame),
            Some(conversion) => match self.cursor.next_frame(conversion.scratch_mut())? {
                ReadStatus::Frame => {
                    conversion.convert_from_scratch(frame)?;
                    Ok(ReadStatus::Frame)
                }
                ReadStatus::EndOfStream => Ok(ReadStatus::EndOfStream),
            },
        }
    }

    /// Advance so the next read yields frame `frame_index`, counting from
    /// the current position.
    ///
    /// Frames are decoded and discarded; no container seek is performed.
    /// Returns how many frames were skipped, which is less than
    /// `frame_index` when the stream ends or a decode error occurs first.
    pub fn seek_frame(
        &mut self,
        frame_index: u64,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> u64 {
        let skipped = self.cursor.skip(frame_index, OperationType::Seeking, progress);
        if skipped < frame_index {
            log::debug!("Seek to frame {frame_index} stopped after {skipped} frames");
        }
        skipped
    }

    /// Iterate over the remaining frames, each in its own buffer.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames::new(self)
    }

    /// Allocate a frame suited to [`read_frame`](Self::read_frame).
    ///
    /// With conversion the frame has buffers in the requested format.
    /// Without, it is empty and takes the decoder's buffers.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Allocation`] if buffers cannot be allocated.
    pub fn allocate_frame(&self) -> Result<VideoFrame, PumpError> {
        allocate_frame(self.conversion.as_ref().map(|_| {
            FrameShape::new(self.descriptor.format, self.width, self.height)
        }))
    }

    /// Release the demuxer, decoder and converter.
    pub fn close(self) {
        log::debug!("Closing input pipeline ({})", self.format_name);
    }

    /// Pixel format of frames returned by [`read_frame`](Self::read_frame).
    pub fn pixel_format(&self) -> Pixel {
        self.descriptor.format
    }

    /// Descriptor of the returned pixel format.
    pub fn descriptor(&self) -> FormatDescriptor {
        self.descriptor
    }

    /// Descriptor of the decoder's native pixel format.
    pub fn native_descriptor(&self) -> FormatDescriptor {
        self.native
    }

    /// Per-component dimensions of returned frames.
    pub fn plane_layout(&self) -> &PlaneLayout {
        &self.layout
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame rate of the stream.
    pub fn frame_rate(&self) -> Rational {
        self.frame_rate
    }

    /// Time base of frame timestamps.
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Index of the video stream inside the container.
    pub fn stream_index(&self) -> usize {
        self.cursor.stream_index()
    }

    /// Short name of the container format.
    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    /// Frame count, if it was determined at open.
    pub fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    /// The conversion applied to decoded frames, if any.
    pub fn conversion(&self) -> Option<ConverterBinding> {
        self.conversion.as_ref().map(PixelConversion::binding)
    }
}

/// Frame count known without decoding.
///
/// The container's own count wins; single-image formats that store none
/// hold one frame.
fn reported_frame_count(parts: &InputParts) -> Option<u64> {
    if parts.reported_frames > 0 {
        return Some(parts.reported_frames);
    }
    is_single_image_format(&parts.format_name).then_some(1)
}
