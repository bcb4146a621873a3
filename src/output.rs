//! Encoding side: create a container and write frames into one video stream.
//!
//! An [`OutputPipeline`] owns the encoder, the muxer and, when the encoder
//! was negotiated to a different pixel format than the caller's frames, a
//! converter into the encoder's format.
//!
//! # Example
//!
//! ```no_run
//! use framepump::{OutputOptions, OutputPipeline, Pixel, Rational};
//!
//! framepump::init(framepump::FfmpegLogLevel::Error)?;
//! let options = OutputOptions::new(Pixel::RGB24, 320, 240, Rational::new(25, 1))
//!     .with_encoder("ffv1");
//! let mut output = OutputPipeline::open("out.mkv", &options)?;
//!
//! let mut frame = output.allocate_frame()?;
//! for _ in 0..25 {
//!     framepump::clear_frame(&mut frame)?;
//!     output.write_frame(&mut frame)?;
//! }
//! output.close()?;
//! # Ok::<(), framepump::PumpError>(())
//! ```

use std::path::Path;

use ffmpeg_next::{Packet, Rational, format::Pixel, frame::Video as VideoFrame};

use crate::backend::{FrameEncoder, Muxer, Received, ffmpeg};
use crate::config::OutputOptions;
use crate::conversion::{ConverterBinding, PixelConversion};
use crate::descriptor::{FormatDescriptor, PlaneLayout};
use crate::error::PumpError;
use crate::frame::{FrameShape, allocate_frame};

/// Upper bound on muxer flush rounds at close.
const MAX_MUXER_FLUSHES: usize = 1024;

/// An opened encoder and muxer with the facts an output pipeline needs.
///
/// Produced by [`OutputPipeline::open`] internally; build one by hand to
/// run a pipeline over a custom backend with
/// [`OutputPipeline::from_parts`].
pub struct OutputParts {
    /// Opened encoder.
    pub encoder: Box<dyn FrameEncoder>,
    /// Muxer whose header has been written.
    pub muxer: Box<dyn Muxer>,
    /// Index of the encoded stream inside the container.
    pub stream_index: usize,
    /// Name of the chosen encoder.
    pub encoder_name: String,
    /// Pixel format the encoder was opened with.
    pub pixel_format: Pixel,
    /// Time base of frames sent to the encoder.
    pub codec_time_base: Rational,
    /// Time base of the container stream.
    pub stream_time_base: Rational,
}

/// Moves encoded packets into the container.
struct PacketSink {
    muxer: Box<dyn Muxer>,
    stream_index: usize,
    codec_time_base: Rational,
    stream_time_base: Rational,
    packets_written: u64,
}

impl PacketSink {
    /// Write every packet the encoder has ready.
    ///
    /// Packets without a pts get `fallback_pts`, in codec time base.
    fn drain(
        &mut self,
        encoder: &mut dyn FrameEncoder,
        fallback_pts: Option<i64>,
    ) -> Result<(), PumpError> {
        let mut packet = Packet::empty();
        loop {
            let received = encoder
                .receive_packet(&mut packet)
                .map_err(|error| PumpError::Encode(error.to_string()))?;
            if received != Received::Ready(()) {
                return Ok(());
            }

            if packet.pts().is_none() {
                packet.set_pts(fallback_pts);
            }
            packet.rescale_ts(self.codec_time_base, self.stream_time_base);
            packet.set_stream(self.stream_index);

            self.muxer
                .write_packet(&mut packet)
                .map_err(|error| PumpError::Encode(format!("cannot write packet: {error}")))?;
            self.packets_written += 1;
        }
    }

    /// Flush the muxer until it reports nothing buffered.
    fn flush(&mut self) -> Result<(), PumpError> {
        for _ in 0..MAX_MUXER_FLUSHES {
            let done = self
                .muxer
                .flush()
                .map_err(|error| PumpError::Flush(format!("muxer flush failed: {error}")))?;
            if done {
                return Ok(());
            }
        }
        log::warn!("Muxer still buffering after {MAX_MUXER_FLUSHES} flushes");
        Ok(())
    }
}

/// A writable video stream.
pub struct OutputPipeline {
    encoder: Box<dyn FrameEncoder>,
    sink: PacketSink,
    conversion: Option<PixelConversion>,
    source: FormatDescriptor,
    layout: PlaneLayout,
    pixel_format: Pixel,
    encoder_name: String,
    width: u32,
    height: u32,
    frame_rate: Rational,
    frames_submitted: i64,
}

impl OutputPipeline {
    /// Create an output file with one video stream.
    ///
    /// The encoder is chosen in order from the preferred encoder name, the
    /// fallback codec, and the container's default video encoder; the first
    /// two only if the container accepts them. The pixel format is
    /// negotiated against the encoder's supported formats. On success the
    /// container header has been written.
    ///
    /// A failed open may leave an empty file behind.
    ///
    /// # Errors
    ///
    /// - [`PumpError::InvalidOptions`] if the option string cannot be parsed.
    /// - [`PumpError::Open`] if the container cannot be created, the encoder
    ///   cannot be opened, or the header cannot be written.
    /// - [`PumpError::NoEncoder`] if no encoder is acceptable.
    /// - [`PumpError::UnsupportedPixelFormat`] if the requested pixel format
    ///   is not supported by the chosen encoder.
    pub fn open<P: AsRef<Path>>(path: P, options: &OutputOptions) -> Result<Self, PumpError> {
        let path = path.as_ref();
        log::debug!("Opening output {:?} ({:?})", path, options);
        let parts = ffmpeg::open_output_parts(path, options)?;
        Self::from_parts(parts, options)
    }

    /// Build a pipeline over an opened encoder and muxer.
    ///
    /// The backend-facing settings of `options` are ignored; its source
    /// format and geometry describe the frames that will be written.
    ///
    /// # Errors
    ///
    /// - [`PumpError::UnknownPixelFormat`] if the source format has no
    ///   descriptor.
    /// - [`PumpError::Conversion`] or [`PumpError::Allocation`] if the
    ///   converter into the encoder's format cannot be set up.
    pub fn from_parts(parts: OutputParts, options: &OutputOptions) -> Result<Self, PumpError> {
        let source = FormatDescriptor::resolve(options.source_format)?;

        let conversion = if parts.pixel_format == options.source_format {
            None
        } else {
            Some(PixelConversion::for_encoder(ConverterBinding {
                source: options.source_format,
                destination: parts.pixel_format,
                width: options.width,
                height: options.height,
            })?)
        };

        log::debug!(
            "Output pipeline ready: encoder {}, {}x{} {:?} -> {:?}",
            parts.encoder_name,
            options.width,
            options.height,
            options.source_format,
            parts.pixel_format,
        );

        Ok(Self {
            encoder: parts.encoder,
            sink: PacketSink {
                muxer: parts.muxer,
                stream_index: parts.stream_index,
                codec_time_base: parts.codec_time_base,
                stream_time_base: parts.stream_time_base,
                packets_written: 0,
            },
            conversion,
            source,
            layout: source.plane_layout(options.width, options.height),
            pixel_format: parts.pixel_format,
            encoder_name: parts.encoder_name,
            width: options.width,
            height: options.height,
            frame_rate: options.frame_rate,
            frames_submitted: 0,
        })
    }

    /// Encode one frame and write whatever packets the encoder releases.
    ///
    /// `frame` must be in the source format at the pipeline's size. Its
    /// timestamp is replaced by the number of frames written before it,
    /// which is exact because the encoder time base is one frame. With
    /// conversion, the converted copy is stamped and `frame` is left as is.
    ///
    /// Encoders may hold frames back; those packets appear on later writes
    /// or at [`close`](Self::close). A held frame shares `frame`'s buffers,
    /// so make it writable (see [`clear_frame`](crate::clear_frame)) before
    /// changing its pixels for the next call.
    ///
    /// # Errors
    ///
    /// - [`PumpError::Conversion`] if pixel conversion fails.
    /// - [`PumpError::Encode`] if the encoder rejects the frame or writing
    ///   a packet fails.
    pub fn write_frame(&mut self, frame: &mut VideoFrame) -> Result<(), PumpError> {
        let submitted = match self.conversion.as_mut() {
            Some(conversion) => conversion.convert_into_scratch(frame)?,
            None => frame,
        };

        submitted.set_pts(Some(self.frames_submitted));
        self.encoder
            .send_frame(submitted)
            .map_err(|error| PumpError::Encode(error.to_string()))?;
        self.frames_submitted += 1;

        let fallback_pts = submitted.timestamp().or(submitted.pts());
        self.sink.drain(self.encoder.as_mut(), fallback_pts)
    }

    /// Flush the encoder and the muxer, write the trailer, and release
    /// everything.
    ///
    /// The trailer is written even when flushing fails; the muxer flush is
    /// skipped after an encoder flush failure.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Flush`] carrying the first failure.
    pub fn close(mut self) -> Result<(), PumpError> {
        let mut first_error = self.flush_encoder().err();
        if let Some(error) = &first_error {
            log::warn!("Encoder flush failed, skipping muxer flush: {error}");
        } else if let Err(error) = self.sink.flush() {
            log::warn!("{error}");
            first_error = Some(error);
        }

        if let Err(error) = self.sink.muxer.write_trailer() {
            log::warn!("Cannot write trailer: {error}");
            if first_error.is_none() {
                first_error = Some(PumpError::Flush(format!("cannot write trailer: {error}")));
            }
        }

        log::debug!(
            "Closed output pipeline: {} frames in, {} packets out",
            self.frames_submitted,
            self.sink.packets_written,
        );

        match first_error {
            None => Ok(()),
            Some(error @ PumpError::Flush(_)) => Err(error),
            Some(error) => Err(PumpError::Flush(error.to_string())),
        }
    }

    fn flush_encoder(&mut self) -> Result<(), PumpError> {
        self.encoder
            .send_eof()
            .map_err(|error| PumpError::Flush(format!("encoder flush failed: {error}")))?;
        self.sink.drain(self.encoder.as_mut(), None)
    }

    /// Allocate a frame in the source format at the pipeline's size.
    ///
    /// # Errors
    ///
    /// Returns [`PumpError::Allocation`] if buffers cannot be allocated.
    pub fn allocate_frame(&self) -> Result<VideoFrame, PumpError> {
        allocate_frame(Some(FrameShape::new(
            self.source.format,
            self.width,
            self.height,
        )))
    }

    /// Pixel format frames are written in.
    pub fn source_format(&self) -> Pixel {
        self.source.format
    }

    /// Descriptor of the source pixel format.
    pub fn descriptor(&self) -> FormatDescriptor {
        self.source
    }

    /// Per-component dimensions of frames written in.
    pub fn plane_layout(&self) -> &PlaneLayout {
        &self.layout
    }

    /// Pixel format the encoder works in.
    pub fn pixel_format(&self) -> Pixel {
        self.pixel_format
    }

    /// Name of the chosen encoder.
    pub fn encoder_name(&self) -> &str {
        &self.encoder_name
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

    /// Time base of frames sent to the encoder.
    pub fn codec_time_base(&self) -> Rational {
        self.sink.codec_time_base
    }

    /// Time base of the container stream.
    pub fn stream_time_base(&self) -> Rational {
        self.sink.stream_time_base
    }

    /// Index of the video stream inside the container.
    pub fn stream_index(&self) -> usize {
        self.sink.stream_index
    }

    /// Frames submitted to the encoder so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_submitted as u64
    }

    /// Packets written to the container so far.
    pub fn packets_written(&self) -> u64 {
        self.sink.packets_written
    }

    /// The conversion applied to written frames, if any.
    pub fn conversion(&self) -> Option<ConverterBinding> {
        self.conversion.as_ref().map(PixelConversion::binding)
    }
}
