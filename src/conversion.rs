//! Pixel-format conversion attached to a pipeline.
//!
//! An input pipeline converts decoded frames from the decoder's native
//! format into the format the caller asked for. An output pipeline converts
//! caller frames into the format the encoder was negotiated to. Both sides
//! keep one scratch frame between calls so the conversion never allocates
//! per frame.

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};

use crate::backend::Scaler;
use crate::backend::ffmpeg::FfmpegScaler;
use crate::error::PumpError;
use crate::frame::{FrameShape, allocate_frame, make_writable};

/// Source and destination of a pixel-format conversion.
///
/// Both sides have the same size; conversion never rescales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConverterBinding {
    /// Format frames are converted from.
    pub source: Pixel,
    /// Format frames are converted to.
    pub destination: Pixel,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

/// A scaler plus its scratch frame.
pub(crate) struct PixelConversion {
    binding: ConverterBinding,
    scaler: Box<dyn Scaler>,
    scratch: VideoFrame,
}

impl PixelConversion {
    /// Decoder-side conversion. The scratch frame receives decoded frames
    /// and gets its buffers from the decoder.
    pub(crate) fn for_decoder(binding: ConverterBinding) -> Result<Self, PumpError> {
        Ok(Self {
            binding,
            scaler: Box::new(FfmpegScaler::new(binding)?),
            scratch: allocate_frame(None)?,
        })
    }

    /// Encoder-side conversion. The scratch frame holds converted frames in
    /// the destination format.
    pub(crate) fn for_encoder(binding: ConverterBinding) -> Result<Self, PumpError> {
        let scratch = allocate_frame(Some(FrameShape::new(
            binding.destination,
            binding.width,
            binding.height,
        )))?;
        Ok(Self {
            binding,
            scaler: Box::new(FfmpegScaler::new(binding)?),
            scratch,
        })
    }

    pub(crate) fn binding(&self) -> ConverterBinding {
        self.binding
    }

    pub(crate) fn scratch_mut(&mut self) -> &mut VideoFrame {
        &mut self.scratch
    }

    /// Convert the scratch frame into `destination`, carrying its timestamp.
    pub(crate) fn convert_from_scratch(
        &mut self,
        destination: &mut VideoFrame,
    ) -> Result<(), PumpError> {
        // An encoder may still reference the previous picture.
        if !destination.is_empty() {
            make_writable(destination)?;
        }
        self.scaler
            .scale(&self.scratch, destination)
            .map_err(|error| self.conversion_error(error))?;
        destination.set_pts(self.scratch.pts());
        Ok(())
    }

    /// Convert `source` into the scratch frame and hand it out.
    pub(crate) fn convert_into_scratch(
        &mut self,
        source: &VideoFrame,
    ) -> Result<&mut VideoFrame, PumpError> {
        // The encoder may hold the previous scratch picture.
        make_writable(&mut self.scratch)?;
        self.scaler
            .scale(source, &mut self.scratch)
            .map_err(|error| self.conversion_error(error))?;
        Ok(&mut self.scratch)
    }

    fn conversion_error(&self, error: ffmpeg_next::Error) -> PumpError {
        PumpError::Conversion(format!(
            "{:?} -> {:?}: {error}",
            self.binding.source, self.binding.destination
        ))
    }
}
